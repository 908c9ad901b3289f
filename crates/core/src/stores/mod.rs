pub mod azure_openai;
pub mod azure_search;

pub use azure_openai::{AzureOpenAiClient, AzureOpenAiConfig};
pub use azure_search::{AzureSearchConfig, AzureSearchStore};

use url::Url;

/// `{endpoint}/{path}?api-version={api_version}`, tolerant of a missing or
/// doubled slash between endpoint and path.
pub(crate) fn endpoint_url(
    endpoint: &str,
    path: &str,
    api_version: &str,
) -> Result<Url, url::ParseError> {
    let base = if endpoint.ends_with('/') {
        Url::parse(endpoint)?
    } else {
        Url::parse(&format!("{endpoint}/"))?
    };

    let mut url = base.join(path.trim_start_matches('/'))?;
    url.query_pairs_mut().append_pair("api-version", api_version);
    Ok(url)
}

/// Body of a failed response, for error details. Never fails itself.
pub(crate) async fn failure_details(response: reqwest::Response) -> String {
    let status = response.status();
    match response.text().await {
        Ok(body) if !body.trim().is_empty() => format!("{status}: {}", body.trim()),
        _ => status.to_string(),
    }
}
