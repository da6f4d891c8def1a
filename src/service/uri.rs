/// Host the catalog seeds into picture references before deployment.
pub const PLACEHOLDER_BASE_URL: &str = "http://catalogbaseurltobereplaced";

/// Turns a catalog picture reference into an absolute URI.
pub trait UriComposer: Send + Sync {
    fn compose_picture_uri(&self, reference: &str) -> String;
}

#[derive(Debug, Clone)]
pub struct CatalogUriComposer {
    base_url: String,
}

impl CatalogUriComposer {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url }
    }
}

impl UriComposer for CatalogUriComposer {
    fn compose_picture_uri(&self, reference: &str) -> String {
        if let Some(rest) = reference.strip_prefix(PLACEHOLDER_BASE_URL) {
            return join(&self.base_url, rest);
        }

        if is_absolute(reference) {
            return reference.to_string();
        }

        join(&self.base_url, reference)
    }
}

fn is_absolute(reference: &str) -> bool {
    reference.starts_with("http://") || reference.starts_with("https://")
}

fn join(base: &str, path: &str) -> String {
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        base.to_string()
    } else {
        format!("{base}/{path}")
    }
}
