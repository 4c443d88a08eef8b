//! Deterministic cache-key derivation.
//!
//! Two requests that would send the same prompt to the same model get
//! the same key: content type, parameter map (key-sorted), governing
//! template and model all participate.

use uuid::Uuid;

use shared::params::{canonical_fragment, Parameters};
use shared::ContentType;

/// Fixed namespace so keys are stable across process restarts
const CACHE_NAMESPACE: Uuid = Uuid::from_u128(0x9f2c_e1a7_44d0_4b6e_a1b3_58c902d47f11);

pub fn cache_key(
    content_type: ContentType,
    params: &Parameters,
    template_id: Uuid,
    model: &str,
) -> String {
    let mut parts = vec![format!("type={content_type}")];
    let fragment = canonical_fragment(params);
    if !fragment.is_empty() {
        parts.push(fragment);
    }
    parts.push(format!("template={template_id}"));
    parts.push(format!("model={model}"));

    Uuid::new_v5(&CACHE_NAMESPACE, parts.join("&").as_bytes()).to_string()
}
