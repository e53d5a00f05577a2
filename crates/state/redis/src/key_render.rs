use taggate_state::StateKey;

/// Render a [`StateKey`] into a Redis key string with the given prefix.
///
/// The format is `prefix:family:tenant:kind:id`.
pub fn render_key(prefix: &str, key: &StateKey) -> String {
    format!(
        "{}:{}:{}:{}:{}",
        prefix, key.family, key.tenant, key.kind, key.id
    )
}

#[cfg(test)]
mod tests {
    use taggate_core::ApiFamily;
    use taggate_state::KeyKind;

    use super::*;

    #[test]
    fn renders_standard_key() {
        let key = StateKey::new(ApiFamily::Gtm, "tenant-1", KeyKind::Cache, "GTMTags");
        let rendered = render_key("taggate", &key);
        assert_eq!(rendered, "taggate:gtm:tenant-1:cache:GTMTags");
    }

    #[test]
    fn renders_custom_kind() {
        let key = StateKey::new(
            ApiFamily::Ga4,
            "t",
            KeyKind::Custom("my_kind".into()),
            "id-1",
        );
        let rendered = render_key("pfx", &key);
        assert_eq!(rendered, "pfx:ga4:t:my_kind:id-1");
    }
}
