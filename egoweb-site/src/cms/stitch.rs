//! Link stitching for raw CMS responses
//!
//! The delivery API returns a flat response: matched entries under `items`
//! and everything they reference, up to the requested inclusion depth, under
//! `includes.Entry` / `includes.Asset`. Reference fields inside the items
//! are link stubs pointing into those side tables. This module splices the
//! included entries back into place so the rest of the pipeline sees one
//! nested tree.
//!
//! Stitching only fills in; it never reorders lists or removes nodes.
//! References with no matching include stay as stubs, which is exactly the
//! state the content graph resolver knows how to repair. The depth bound
//! doubles as cycle protection, since entry graphs may be circular.

use serde_json::Value;
use std::collections::HashMap;

/// Side tables from a response's `includes` section, keyed by entry id
#[derive(Debug, Default)]
pub struct IncludeMaps {
    entries: HashMap<String, Value>,
    assets: HashMap<String, Value>,
}

impl IncludeMaps {
    /// Build lookup maps from included entries and assets
    pub fn new(entries: &[Value], assets: &[Value]) -> Self {
        let mut maps = IncludeMaps::default();
        for entry in entries {
            if let Some(id) = egoweb_common::model::sys_id(entry) {
                maps.entries.insert(id.to_string(), entry.clone());
            }
        }
        for asset in assets {
            if let Some(id) = egoweb_common::model::sys_id(asset) {
                maps.assets.insert(id.to_string(), asset.clone());
            }
        }
        maps
    }

    fn lookup(&self, link_type: &str, id: &str) -> Option<&Value> {
        match link_type {
            "Entry" => self.entries.get(id),
            "Asset" => self.assets.get(id),
            // ContentType links and the like are metadata, not content
            _ => None,
        }
    }
}

/// Replace link stubs in `value` with their included targets, recursively,
/// down to `depth` reference hops. Unmatchable links are kept verbatim.
pub fn stitch(value: &Value, maps: &IncludeMaps, depth: u8) -> Value {
    match value {
        Value::Object(object) => {
            if let Some((link_type, id)) = link_parts(value) {
                if depth > 0 {
                    if let Some(target) = maps.lookup(link_type, id) {
                        return stitch_resolved(target, maps, depth - 1);
                    }
                }
                return value.clone();
            }
            let mut out = serde_json::Map::with_capacity(object.len());
            for (key, v) in object {
                out.insert(key.clone(), stitch(v, maps, depth));
            }
            Value::Object(out)
        }
        Value::Array(items) => {
            Value::Array(items.iter().map(|v| stitch(v, maps, depth)).collect())
        }
        _ => value.clone(),
    }
}

/// Stitch inside an already-resolved entry: only its `fields` can hold
/// further references; `sys` holds only metadata links
fn stitch_resolved(value: &Value, maps: &IncludeMaps, depth: u8) -> Value {
    let Value::Object(object) = value else {
        return value.clone();
    };
    let mut out = serde_json::Map::with_capacity(object.len());
    for (key, v) in object {
        if key == "fields" {
            out.insert(key.clone(), stitch(v, maps, depth));
        } else {
            out.insert(key.clone(), v.clone());
        }
    }
    Value::Object(out)
}

fn link_parts(value: &Value) -> Option<(&str, &str)> {
    let sys = value.get("sys")?;
    if sys.get("type")?.as_str()? != "Link" {
        return None;
    }
    Some((sys.get("linkType")?.as_str()?, sys.get("id")?.as_str()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(id: &str, content_type: &str, fields: Value) -> Value {
        json!({
            "sys": {
                "id": id,
                "type": "Entry",
                "contentType": { "sys": { "type": "Link", "linkType": "ContentType", "id": content_type } }
            },
            "fields": fields
        })
    }

    fn entry_link(id: &str) -> Value {
        json!({ "sys": { "type": "Link", "linkType": "Entry", "id": id } })
    }

    #[test]
    fn splices_included_entry_into_item() {
        let item = entry("page1", "page", json!({ "modules": [entry_link("m1")] }));
        let included = [entry("m1", "hero", json!({ "title": "Hi" }))];
        let maps = IncludeMaps::new(&included, &[]);

        let stitched = stitch(&item, &maps, 10);
        let module = &stitched["fields"]["modules"][0];
        assert_eq!(module["sys"]["id"], "m1");
        assert_eq!(module["fields"]["title"], "Hi");
    }

    #[test]
    fn unmatched_link_stays_a_stub() {
        let item = entry("page1", "page", json!({ "modules": [entry_link("missing")] }));
        let maps = IncludeMaps::new(&[], &[]);

        let stitched = stitch(&item, &maps, 10);
        let module = &stitched["fields"]["modules"][0];
        assert_eq!(module["sys"]["type"], "Link");
        assert_eq!(module["sys"]["id"], "missing");
    }

    #[test]
    fn content_type_links_are_left_alone() {
        let item = entry("m1", "hero", json!({ "title": "Hi" }));
        // An entry that happens to share the content type's id must not be
        // spliced into sys.contentType
        let decoy = [entry("hero", "hero", json!({ "title": "decoy" }))];
        let maps = IncludeMaps::new(&decoy, &[]);

        let stitched = stitch(&item, &maps, 10);
        assert_eq!(stitched["sys"]["contentType"]["sys"]["type"], "Link");
    }

    #[test]
    fn depth_bound_stops_circular_graphs() {
        // a -> b -> a
        let a = entry("a", "hero", json!({ "next": entry_link("b") }));
        let b = entry("b", "hero", json!({ "next": entry_link("a") }));
        let maps = IncludeMaps::new(&[a.clone(), b], &[]);

        // Must terminate; past the depth bound the chain ends in a stub
        let stitched = stitch(&a, &maps, 4);
        let mut node = &stitched;
        for _ in 0..5 {
            node = &node["fields"]["next"];
        }
        assert_eq!(node["sys"]["type"], "Link");
    }

    #[test]
    fn resolves_asset_links_separately_from_entries() {
        let item = entry("m1", "hero", json!({
            "backgroundImage": { "sys": { "type": "Link", "linkType": "Asset", "id": "img1" } }
        }));
        let asset = json!({
            "sys": { "id": "img1", "type": "Asset" },
            "fields": { "title": "Banner", "file": { "url": "//img.example/banner.jpg" } }
        });
        let maps = IncludeMaps::new(&[], &[asset]);

        let stitched = stitch(&item, &maps, 10);
        assert_eq!(
            stitched["fields"]["backgroundImage"]["fields"]["file"]["url"],
            "//img.example/banner.jpg"
        );
    }
}
