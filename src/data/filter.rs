// ---------------------------------------------------------------------------
// Block filter: drop whole `-1`-delimited blocks of one type from raw text
// ---------------------------------------------------------------------------

/// Block type some producers append to reconstructed FRF files; the
/// universal parser has no grammar for it.
pub const RECONSTRUCTION_BLOCK_TYPE: u32 = 151;

const DELIMITER: &str = "-1";

/// Remove every block tagged `block_type` from universal-file text.
///
/// A block is dropped when a line reading `-1` is immediately followed by a
/// line reading the tag. Everything from the tag line up to, but not
/// including, the next `-1` line is discarded; copying resumes at that
/// delimiter. All other lines are copied byte-for-byte (line endings
/// included) in their original order.
///
/// This is a best-effort line filter. An unwanted block without a closing
/// delimiter swallows the rest of the input.
pub fn strip_blocks(content: &str, block_type: u32) -> String {
    let tag = block_type.to_string();
    let mut output = String::with_capacity(content.len());
    let mut previous_was_delimiter = false;
    let mut skipping = false;

    for (line_no, line) in content.split_inclusive('\n').enumerate() {
        let trimmed = line.trim();

        if skipping {
            if trimmed == DELIMITER {
                skipping = false;
            } else {
                continue;
            }
        } else if previous_was_delimiter && trimmed == tag {
            log::info!(
                "Found and skipping dataset {tag} starting at line {}",
                line_no + 1
            );
            skipping = true;
            previous_was_delimiter = false;
            continue;
        }

        previous_was_delimiter = trimmed == DELIMITER;
        output.push_str(line);
    }

    if skipping {
        log::warn!("Dataset {tag} is not terminated; remaining lines were dropped");
    }
    output
}
