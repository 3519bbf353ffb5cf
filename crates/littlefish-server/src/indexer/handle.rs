/*
[INPUT]:  Asset units held by an address, handle names typed by users
[OUTPUT]: Decoded ADA Handle names and the asset units to look them up by
[POS]:    Indexer layer - ADA Handle naming rules
[UPDATE]: When the handle policy or CIP-68 labels change
*/

use littlefish_adapter::Asset;

pub const HANDLE_POLICY_ID: &str = "f0ff48bbb7bbe9d59a40f1ce90e9e9d0ff5002ec48f232b49ca0fb9a";

/// CIP-68 (222) user token label
const CIP68_USER_PREFIX: &str = "000de140";
/// CIP-68 (100) reference token label
const CIP68_REFERENCE_PREFIX: &str = "000643b0";

/// A handle held at an address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeldHandle {
    pub name: String,
    pub unit: String,
}

/// Decode the hex asset name of a handle token.
///
/// Reference tokens and names that are not UTF-8 yield `None`.
pub fn decode_handle_name(asset_name_hex: &str) -> Option<String> {
    let asset_name_hex = asset_name_hex.to_ascii_lowercase();
    if asset_name_hex.starts_with(CIP68_REFERENCE_PREFIX) {
        return None;
    }
    let name_hex = asset_name_hex
        .strip_prefix(CIP68_USER_PREFIX)
        .unwrap_or(&asset_name_hex);
    let name = String::from_utf8(hex::decode(name_hex).ok()?).ok()?;
    (!name.is_empty()).then_some(name)
}

/// Handles among `assets`, sorted by name
pub fn handles_in(assets: &[Asset]) -> Vec<HeldHandle> {
    let mut handles: Vec<HeldHandle> = assets
        .iter()
        .filter(|asset| asset.quantity != "0")
        .filter_map(|asset| {
            let name_hex = asset.unit.strip_prefix(HANDLE_POLICY_ID)?;
            Some(HeldHandle {
                name: decode_handle_name(name_hex)?,
                unit: asset.unit.clone(),
            })
        })
        .collect();
    handles.sort_by(|a, b| a.name.cmp(&b.name));
    handles.dedup_by(|a, b| a.name == b.name);
    handles
}

/// Canonical form of a user-typed handle: trimmed, no `$`, lowercase
pub fn normalize_handle(input: &str) -> Option<String> {
    let name = input.trim().trim_start_matches('$').trim().to_lowercase();
    (!name.is_empty()).then_some(name)
}

/// Asset units a handle may be minted under, legacy first
pub fn handle_units(name: &str) -> [String; 2] {
    let name_hex = hex::encode(name.as_bytes());
    [
        format!("{HANDLE_POLICY_ID}{name_hex}"),
        format!("{HANDLE_POLICY_ID}{CIP68_USER_PREFIX}{name_hex}"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::legacy("6361726461", Some("carda"))]
    #[case::cip68_user("000de1406c6974746c6566697368", Some("littlefish"))]
    #[case::cip68_reference("000643b06c6974746c6566697368", None)]
    #[case::not_hex("zz", None)]
    #[case::not_utf8("ff", None)]
    #[case::empty("", None)]
    fn test_decode_handle_name(#[case] hex_name: &str, #[case] expected: Option<&str>) {
        assert_eq!(decode_handle_name(hex_name).as_deref(), expected);
    }

    #[test]
    fn test_handles_in_filters_policy() {
        let assets = vec![
            Asset::new(format!("{HANDLE_POLICY_ID}7a65627261"), "1"),
            Asset::new(format!("{HANDLE_POLICY_ID}000643b07a65627261"), "1"),
            Asset::new(format!("{HANDLE_POLICY_ID}000de14061706531"), "1"),
            Asset::new(
                "a0028f350aaabe0545fdcb56b039bfb08e4bb4d8c4d7c3c7d481c235484f534b59",
                "1000",
            ),
        ];
        let names: Vec<_> = handles_in(&assets).into_iter().map(|h| h.name).collect();
        assert_eq!(names, vec!["ape1", "zebra"]);
    }

    #[test]
    fn test_no_handles() {
        assert!(handles_in(&[Asset::new("lovelace", "5000000")]).is_empty());
    }

    #[test]
    fn test_normalize_handle() {
        assert_eq!(normalize_handle(" $Cardano ").as_deref(), Some("cardano"));
        assert_eq!(normalize_handle("$"), None);
        assert_eq!(normalize_handle("   "), None);
    }

    #[test]
    fn test_handle_units() {
        let [legacy, cip68] = handle_units("cardano");
        assert_eq!(legacy, format!("{HANDLE_POLICY_ID}63617264616e6f"));
        assert_eq!(cip68, format!("{HANDLE_POLICY_ID}000de14063617264616e6f"));
    }
}
