use crate::error::Result;
use crate::schema::NormalizedRecord;

/// One JSON object per line in the fixed field order, terminated by a
/// trailing newline. Records serialize straight from the struct so the key
/// order is the declaration order, and serde_json leaves non-ASCII text
/// unescaped, which is the wire contract for this format.
pub fn encode(batch: &[NormalizedRecord]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(batch.len() * 256);
    for record in batch {
        serde_json::to_writer(&mut out, record)?;
        out.push(b'\n');
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_line_per_record_with_trailing_newline() {
        let batch = vec![
            NormalizedRecord {
                gender: Some("male".to_string()),
                first_name: Some("John".to_string()),
                ..Default::default()
            },
            NormalizedRecord {
                gender: Some("female".to_string()),
                ..Default::default()
            },
        ];

        let bytes = encode(&batch).unwrap();
        let text = String::from_utf8(bytes).unwrap();

        assert!(text.ends_with('\n'));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("{\"gender\":\"male\",\"first_name\":\"John\","));
        assert!(lines[1].starts_with("{\"gender\":\"female\",\"first_name\":null,"));
    }

    #[test]
    fn empty_batch_encodes_to_nothing() {
        assert!(encode(&[]).unwrap().is_empty());
    }

    #[test]
    fn non_ascii_text_survives_unescaped() {
        let batch = vec![NormalizedRecord {
            first_name: Some("José".to_string()),
            city: Some("Bogotá".to_string()),
            ..Default::default()
        }];

        let text = String::from_utf8(encode(&batch).unwrap()).unwrap();
        assert!(text.contains("José"));
        assert!(text.contains("Bogotá"));
        assert!(!text.contains("\\u"));
    }

    #[test]
    fn every_line_carries_the_full_field_set() {
        let batch = vec![NormalizedRecord::default()];
        let text = String::from_utf8(encode(&batch).unwrap()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(text.trim_end()).unwrap();
        assert_eq!(parsed.as_object().unwrap().len(), crate::schema::FIELDS.len());
    }
}
