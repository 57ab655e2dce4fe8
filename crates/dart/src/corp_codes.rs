//! Parses DART's bulk corp-code master list (`CORPCODE.xml`) into
//! [`CorpMapping`] rows (spec.md §4.8 persistence).
//!
//! No XML or archive crate exists anywhere in this workspace's corpus, so
//! rather than fabricate one, this module hand-parses the one fixed,
//! flat, attribute-free record shape DART actually emits (a repeated
//! `<list><corp_code>/<corp_name>/<stock_code>/<modify_date></list>`
//! block). This is intentionally narrow — not a general XML parser — and
//! the caller is responsible for unzipping `CORPCODE.zip` into this XML
//! text first (see [`crate::client::DartClient::fetch_corp_code_archive`]).

use krfin_resolver::CorpMapping;

/// Parses the decompressed `CORPCODE.xml` text into corp mappings.
/// Malformed or unrecognized `<list>` blocks are skipped rather than
/// failing the whole parse, since a single vendor-data glitch should not
/// block ~100k good rows.
#[must_use]
pub fn parse_corp_code_xml(xml: &str) -> Vec<CorpMapping> {
    let mut out = Vec::new();
    for block in xml.split("<list>").skip(1) {
        let Some(end) = block.find("</list>") else {
            continue;
        };
        let body = &block[..end];

        let (Some(corp_code), Some(corp_name), Some(modify_date)) = (
            extract_tag(body, "corp_code"),
            extract_tag(body, "corp_name"),
            extract_tag(body, "modify_date"),
        ) else {
            continue;
        };

        let stock_code = extract_tag(body, "stock_code")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        out.push(CorpMapping {
            corp_code: corp_code.trim().to_string(),
            corp_name: decode_entities(corp_name.trim()),
            stock_code,
            modify_date: modify_date.trim().to_string(),
        });
    }
    out
}

fn extract_tag(body: &str, tag: &str) -> Option<String> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let start = body.find(&open)? + open.len();
    let end = body[start..].find(&close)? + start;
    Some(body[start..end].to_string())
}

fn decode_entities(s: &str) -> String {
    s.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    const SAMPLE: &str = r"<?xml version='1.0' encoding='UTF-8'?>
<result>
    <list>
        <corp_code>00126380</corp_code>
        <corp_name>삼성전자</corp_name>
        <stock_code>005930</stock_code>
        <modify_date>20260115</modify_date>
    </list>
    <list>
        <corp_code>00999999</corp_code>
        <corp_name>비상장 &amp; 기업</corp_name>
        <stock_code> </stock_code>
        <modify_date>20260115</modify_date>
    </list>
</result>";

    #[rstest]
    fn test_parses_listed_and_unlisted_entries() {
        let mappings = parse_corp_code_xml(SAMPLE);
        assert_eq!(mappings.len(), 2);
        assert_eq!(mappings[0].corp_code, "00126380");
        assert_eq!(mappings[0].stock_code.as_deref(), Some("005930"));
        assert_eq!(mappings[1].stock_code, None);
        assert_eq!(mappings[1].corp_name, "비상장 & 기업");
    }

    #[rstest]
    fn test_empty_input_yields_no_mappings() {
        assert!(parse_corp_code_xml("").is_empty());
    }
}
