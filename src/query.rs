//! Query-string merging and form encoding helpers.

use url::form_urlencoded;
use url::Url;

/// Merges query parameters into a URL's existing query string.
///
/// The supplied `params` form the base sequence; pairs already present in
/// the URL overwrite same-named entries and are appended otherwise, so on a
/// name collision the URL's own value wins. The merged query is re-encoded
/// with standard percent-encoding. Empty `params` leave the URL unchanged.
///
/// # Arguments
///
/// * `url` - The absolute target URL string
/// * `params` - Query parameters to merge in, in order
///
/// # Errors
///
/// Returns an error if `url` is not a parseable absolute URL.
pub fn merge_query(url: &str, params: &[(&str, &str)]) -> Result<Url, url::ParseError> {
    let mut target = Url::parse(url)?;
    if params.is_empty() {
        return Ok(target);
    }

    let mut merged: Vec<(String, String)> = params
        .iter()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect();

    let existing: Vec<(String, String)> = target
        .query_pairs()
        .map(|(name, value)| (name.into_owned(), value.into_owned()))
        .collect();

    // URL's own parameters win on collision
    for (name, value) in existing {
        match merged.iter_mut().find(|(merged_name, _)| *merged_name == name) {
            Some(entry) => entry.1 = value,
            None => merged.push((name, value)),
        }
    }

    target.set_query(None);
    target
        .query_pairs_mut()
        .extend_pairs(merged.iter().map(|(name, value)| (name.as_str(), value.as_str())));
    Ok(target)
}

/// Encodes form fields as an `application/x-www-form-urlencoded` body.
///
/// An empty field list produces an empty string.
pub fn form_encode(fields: &[(&str, &str)]) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(fields)
        .finish()
}
