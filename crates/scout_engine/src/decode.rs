use chardetng::EncodingDetector;
use encoding_rs::Encoding;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedBody {
    pub text: String,
    pub encoding: &'static str,
    /// Some bytes were invalid for `encoding` and became U+FFFD.
    pub had_errors: bool,
}

/// Decodes a response body to UTF-8. Encoding is chosen from the BOM, then the
/// Content-Type charset, then a chardetng guess. Malformed sequences are
/// replaced, never rejected.
pub fn decode_body(bytes: &[u8], content_type: Option<&str>) -> DecodedBody {
    let encoding = Encoding::for_bom(bytes)
        .map(|(encoding, _)| encoding)
        .or_else(|| {
            content_type
                .and_then(charset_label)
                .and_then(|label| Encoding::for_label(label.as_bytes()))
        })
        .unwrap_or_else(|| {
            let mut detector = EncodingDetector::new();
            detector.feed(bytes, true);
            detector.guess(None, true)
        });

    let (text, _, had_errors) = encoding.decode(bytes);
    DecodedBody {
        text: text.into_owned(),
        encoding: encoding.name(),
        had_errors,
    }
}

fn charset_label(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        name.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches(['"', '\'']).to_string())
    })
}
