//! Schema introspection entry point.

use crate::configurable::Configurable;
use crate::schema::FieldMap;

/// Describes every configurable field of `instance`.
///
/// Non-zero field values of `instance` are reported as defaults, so passing a
/// live, configured value yields its applied configuration.
pub fn describe<T: Configurable + ?Sized>(instance: &T) -> FieldMap {
    let mut fields = FieldMap::new();
    instance.describe_into(&mut fields);
    fields
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde_json::json;

    use super::*;
    use crate::schema::FieldKind;
    use crate::units::{Duration, Size};
    use crate::{ConfigField, Configurable};

    #[derive(Debug, Clone, Default, Configurable)]
    pub struct Subscription {
        pub name: String,
        pub origin: String,
    }

    #[derive(Debug, Clone, Default, Configurable)]
    pub struct ClientTls {
        pub tls_ca: String,
        pub insecure_skip_verify: bool,
    }

    #[derive(Debug, Clone, Default, Configurable)]
    pub struct MetricQuery {
        pub statistic_exclude: Option<Vec<String>>,
        pub metric_names: Vec<String>,
    }

    #[derive(Default, Configurable)]
    pub struct Gnmi {
        #[config(required)]
        pub addresses: Vec<String>,
        pub subscriptions: Vec<Subscription>,
        pub metrics: Vec<Box<MetricQuery>>,
        pub aliases: HashMap<String, String>,
        pub encoding: String,
        pub redial: Duration,
        pub max_msg_size: Size,
        #[config(format = "url")]
        pub endpoint: String,
        pub target: Subscription,
        #[config(flatten)]
        pub tls: ClientTls,
        #[config(skip)]
        pub internal_state: u64,
        pub on_event: Option<fn(&str)>,
        pub hook: Option<Box<dyn Fn() + Send + Sync>>,
        cache: Vec<String>,
    }

    fn gnmi() -> Gnmi {
        Gnmi {
            encoding: "proto".into(),
            redial: Duration::from_secs(10),
            ..Default::default()
        }
    }

    #[test]
    fn test_keys_are_exactly_public_configurable_fields() {
        let fields = describe(&gnmi());
        let keys: Vec<&str> = fields.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec![
                "addresses",
                "aliases",
                "encoding",
                "endpoint",
                "insecure_skip_verify",
                "max_msg_size",
                "metrics",
                "redial",
                "subscriptions",
                "target",
                "tls_ca",
            ]
        );
    }

    #[test]
    fn test_slice_of_objects() {
        let fields = describe(&gnmi());
        let subs = &fields["subscriptions"];
        assert_eq!(subs.kind, FieldKind::Array);
        assert_eq!(subs.element_kind, Some(FieldKind::Object));
        assert_eq!(subs.fields["name"].kind, FieldKind::String);
    }

    #[test]
    fn test_slice_of_boxed_objects() {
        let fields = describe(&gnmi());
        let metrics = &fields["metrics"];
        assert_eq!(metrics.kind, FieldKind::Array);
        assert_eq!(metrics.element_kind, Some(FieldKind::Object));
        assert_eq!(metrics.fields["statistic_exclude"].kind, FieldKind::Array);
        assert_eq!(metrics.fields["metric_names"].kind, FieldKind::Array);
    }

    #[test]
    fn test_map_of_strings() {
        let fields = describe(&gnmi());
        assert_eq!(fields["aliases"].kind, FieldKind::Map);
        assert_eq!(fields["aliases"].element_kind, Some(FieldKind::String));
        assert!(fields["aliases"].fields.is_empty());
    }

    #[test]
    fn test_defaults_come_from_instance() {
        let fields = describe(&gnmi());
        assert_eq!(fields["encoding"].default, Some(json!("proto")));
        assert_eq!(fields["redial"].default, Some(json!(10_000_000_000u64)));
        assert_eq!(fields["redial"].kind, FieldKind::Duration);
        assert_eq!(fields["max_msg_size"].kind, FieldKind::Size);
        assert!(fields["addresses"].default.is_none());
    }

    #[test]
    fn test_flattened_fields_are_inline() {
        let fields = describe(&gnmi());
        assert_eq!(fields["insecure_skip_verify"].kind, FieldKind::Bool);
        assert!(!fields.contains_key("tls"));
    }

    #[test]
    fn test_named_struct_is_object() {
        let fields = describe(&gnmi());
        let target = &fields["target"];
        assert_eq!(target.kind, FieldKind::Object);
        assert_eq!(target.fields.len(), 2);
        assert!(target.default.is_none());
    }

    #[test]
    fn test_format_and_required() {
        let fields = describe(&gnmi());
        assert_eq!(fields["endpoint"].format, "url");
        assert!(fields["addresses"].required);
        assert!(!fields["encoding"].required);
    }

    #[test]
    fn test_object_kind_for_derived_struct() {
        assert_eq!(Subscription::field_kind(), FieldKind::Object);
        assert_eq!(Subscription::object_fields().len(), 2);
    }
}
