//! Payload classification.
//!
//! Tile servers routinely answer HTTP 200 with an HTML error page instead
//! of image bytes. These checks sniff the first bytes of a fetched file,
//! after skipping leading whitespace, against a small set of known
//! document openers, independent of HTTP status. The file's read position
//! is preserved around the sniff.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};

/// How many leading bytes are examined.
const SNIFF_LEN: usize = 32;

/// Openers that mark a markup (error page) document.
const HTML_OPENERS: &[&str] = &["<html", "<!DOCTYPE html", "<head", "<title"];

/// Openers of structured-text payloads some sources legitimately serve.
const XML_OPENERS: &[&str] = &["<?xml"];

/// Reads the leading bytes of `source`, restoring its position.
fn leading_bytes<R: Read + Seek>(source: &mut R) -> io::Result<Vec<u8>> {
    let pos = source.stream_position()?;
    source.seek(SeekFrom::Start(0))?;

    let mut buf = [0u8; SNIFF_LEN];
    let mut filled = 0;
    while filled < buf.len() {
        let n = source.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }

    source.seek(SeekFrom::Start(pos))?;
    Ok(buf[..filled].to_vec())
}

/// True when the bytes, after leading whitespace, start with any opener.
fn starts_with_any(bytes: &[u8], openers: &[&str]) -> bool {
    let Some(start) = bytes.iter().position(|b| !b.is_ascii_whitespace()) else {
        return false;
    };
    let lead = &bytes[start..];
    openers.iter().any(|opener| {
        lead.len() >= opener.len() && lead[..opener.len()].eq_ignore_ascii_case(opener.as_bytes())
    })
}

fn sniff(file: &mut File, openers: &[&str]) -> bool {
    leading_bytes(file)
        .map(|bytes| starts_with_any(&bytes, openers))
        .unwrap_or(false)
}

/// True when the file sniffs as an HTML document (an error page, not a tile).
pub fn is_html_file(file: &mut File) -> bool {
    sniff(file, HTML_OPENERS)
}

/// True when the file sniffs as an XML document.
pub fn is_kml_file(file: &mut File) -> bool {
    sniff(file, XML_OPENERS)
}

/// Acceptance check for map tiles: anything that is not an HTML error page.
pub fn is_map_file(file: &mut File) -> bool {
    !is_html_file(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn file_with(content: &[u8]) -> File {
        let mut file = tempfile::tempfile().unwrap();
        file.write_all(content).unwrap();
        file
    }

    #[test]
    fn test_html_document_is_detected() {
        for content in [
            &b"<html><body>tile not found</body></html>"[..],
            b"<!DOCTYPE html>\n<html>",
            b"<HEAD><TITLE>404</TITLE>",
            b"  \n\t <html>",
            b"<title>Service Unavailable</title>",
        ] {
            let mut file = file_with(content);
            assert!(is_html_file(&mut file), "{:?}", content);
            assert!(!is_map_file(&mut file));
        }
    }

    #[test]
    fn test_image_bytes_are_accepted() {
        // PNG magic followed by junk
        let mut file = file_with(b"\x89PNG\r\n\x1a\n_____________");
        assert!(!is_html_file(&mut file));
        assert!(is_map_file(&mut file));

        // JPEG magic
        let mut file = file_with(&[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46]);
        assert!(is_map_file(&mut file));
    }

    #[test]
    fn test_xml_document_is_classified() {
        let mut file = file_with(b"<?xml version=\"1.0\"?><kml>");
        assert!(is_kml_file(&mut file));
        // XML is not HTML, so the map check accepts it
        assert!(is_map_file(&mut file));
    }

    #[test]
    fn test_empty_and_whitespace_files() {
        let mut file = file_with(b"");
        assert!(!is_html_file(&mut file));
        assert!(is_map_file(&mut file));

        let mut file = file_with(b"   \n\t  ");
        assert!(!is_html_file(&mut file));
    }

    #[test]
    fn test_opener_must_fit_in_sniff_window() {
        // Whitespace pushing the opener past the window hides it
        let mut content = vec![b' '; SNIFF_LEN];
        content.extend_from_slice(b"<html>");
        let mut file = file_with(&content);
        assert!(!is_html_file(&mut file));
    }

    #[test]
    fn test_position_is_preserved() {
        let mut file = file_with(b"<html>error page</html>");
        file.seek(SeekFrom::Start(6)).unwrap();
        assert!(is_html_file(&mut file));
        assert_eq!(file.stream_position().unwrap(), 6);
    }
}
