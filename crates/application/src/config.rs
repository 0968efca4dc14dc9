/// Startup configuration, normally taken from the page query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewerConfig {
    pub facsimile_source: Option<String>,
    pub listing_source: Option<String>,
    pub initial_surface: Option<String>,
}

impl ViewerConfig {
    /// Reads `facs`, `listing` and `targSurface` from a query string (a
    /// leading `?` is allowed). Values are percent-decoded and trimmed;
    /// empty values count as absent, and the first occurrence of a key wins.
    pub fn from_query(query: &str) -> Self {
        let query = query.trim().trim_start_matches('?');
        let mut config = Self::default();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            let slot = match &*key {
                "facs" => &mut config.facsimile_source,
                "listing" => &mut config.listing_source,
                "targSurface" => &mut config.initial_surface,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.to_string());
            }
        }
        config
    }

    pub fn is_empty(&self) -> bool {
        self.facsimile_source.is_none() && self.listing_source.is_none()
    }
}
