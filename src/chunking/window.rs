//! Lazy overlapping windows over a string.

use crate::error::Result;

use super::ChunkingConfig;

/// One window produced by [`Chunks`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window<'a> {
    /// The window's text, a slice of the input.
    pub text: &'a str,
    /// Char offset of the first char.
    pub start: usize,
    /// Char offset one past the last char.
    pub end: usize,
}

/// Iterator over overlapping char windows.
///
/// Windows borrow from the input. A clone resumes from the same position, so
/// cloning a fresh iterator from [`chunk`] walks the windows again.
#[derive(Debug, Clone)]
pub struct Chunks<'a> {
    text: &'a str,
    chunk_size: usize,
    step: usize,
    /// Byte and char offset of the next window, `None` once the end was reached.
    next: Option<(usize, usize)>,
}

impl<'a> Chunks<'a> {
    /// Create windows without validating the configuration.
    ///
    /// Callers must guarantee `0 < overlap < chunk_size`.
    pub(crate) fn new(text: &'a str, chunk_size: usize, overlap: usize) -> Self {
        debug_assert!(overlap > 0 && overlap < chunk_size);
        Self {
            text,
            chunk_size,
            step: chunk_size - overlap,
            next: Some((0, 0)),
        }
    }
}

impl<'a> Iterator for Chunks<'a> {
    type Item = Window<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let (start_byte, start_char) = self.next?;
        let rest = &self.text[start_byte..];

        if rest.is_empty() {
            self.next = None;
            return None;
        }

        let mut step_byte = rest.len();
        let mut end_byte = rest.len();
        let mut len = 0;

        for (n, (byte, _)) in rest.char_indices().enumerate() {
            if n == self.step {
                step_byte = byte;
            }
            if n == self.chunk_size {
                end_byte = byte;
                break;
            }
            len = n + 1;
        }

        self.next = if end_byte == rest.len() {
            None
        } else {
            Some((start_byte + step_byte, start_char + self.step))
        };

        Some(Window {
            text: &rest[..end_byte],
            start: start_char,
            end: start_char + len,
        })
    }
}

/// Split `text` into windows of `chunk_size` chars overlapping by `overlap` chars.
///
/// The last window may be shorter than `chunk_size`. Empty text yields no windows.
pub fn chunk(text: &str, chunk_size: usize, overlap: usize) -> Result<Chunks<'_>> {
    ChunkingConfig { chunk_size, overlap }.validate()?;
    Ok(Chunks::new(text, chunk_size, overlap))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Rebuild the input by dropping each window's overlap with its predecessor.
    fn reconstruct(windows: &[Window<'_>], overlap: usize) -> String {
        let mut out = String::new();
        for (i, w) in windows.iter().enumerate() {
            if i == 0 {
                out.push_str(w.text);
            } else {
                out.extend(w.text.chars().skip(overlap));
            }
        }
        out
    }

    fn assert_windows_valid(text: &str, chunk_size: usize, overlap: usize) {
        let windows: Vec<Window<'_>> = chunk(text, chunk_size, overlap).unwrap().collect();

        assert_eq!(reconstruct(&windows, overlap), text, "size {chunk_size} overlap {overlap}");

        for w in &windows {
            let len = w.text.chars().count();
            assert!(len <= chunk_size);
            assert_eq!(w.end - w.start, len);
        }
        for pair in windows.windows(2) {
            let tail: String = pair[0].text.chars().skip(chunk_size - overlap).collect();
            let head: String = pair[1].text.chars().take(overlap).collect();
            assert_eq!(pair[0].text.chars().count(), chunk_size);
            assert_eq!(tail.chars().count(), overlap);
            assert_eq!(tail, head);
        }
    }

    #[test]
    fn test_basic_windows() {
        let windows: Vec<_> = chunk("abcdefghij", 4, 1).unwrap().collect();
        let texts: Vec<&str> = windows.iter().map(|w| w.text).collect();
        assert_eq!(texts, vec!["abcd", "defg", "ghij"]);
        assert_eq!(windows[2].start, 6);
        assert_eq!(windows[2].end, 10);
    }

    #[test]
    fn test_last_window_may_be_short() {
        let texts: Vec<&str> = chunk("abcdefgh", 4, 1).unwrap().map(|w| w.text).collect();
        assert_eq!(texts, vec!["abcd", "defg", "gh"]);
    }

    #[test]
    fn test_text_shorter_than_chunk() {
        let texts: Vec<&str> = chunk("abc", 10, 3).unwrap().map(|w| w.text).collect();
        assert_eq!(texts, vec!["abc"]);
    }

    #[test]
    fn test_empty_text() {
        assert_eq!(chunk("", 10, 3).unwrap().count(), 0);
    }

    #[test]
    fn test_invalid_overlap() {
        assert!(chunk("abc", 4, 0).is_err());
        assert!(chunk("abc", 4, 4).is_err());
    }

    #[test]
    fn test_reconstruction_and_overlap_many_configs() {
        let text = "Employees must request access through the service desk. \
                    Privileged access is reviewed quarterly by the security team; \
                    dormant accounts are disabled after 90 days.";
        for chunk_size in 2..40 {
            for overlap in 1..chunk_size {
                assert_windows_valid(text, chunk_size, overlap);
            }
        }
    }

    #[test]
    fn test_multibyte_text() {
        let text = "Politique d'accès: les employés — et les sous-traitants — doivent être approuvés. 🔐✓";
        for chunk_size in 2..12 {
            for overlap in 1..chunk_size {
                assert_windows_valid(text, chunk_size, overlap);
            }
        }
    }

    #[test]
    fn test_clone_restarts_iteration() {
        let chunks = chunk("abcdefghij", 4, 2).unwrap();
        let first: Vec<_> = chunks.clone().collect();
        let second: Vec<_> = chunks.collect();
        assert_eq!(first, second);

        let mut partial = chunk("abcdefghij", 4, 2).unwrap();
        partial.next();
        let resumed = partial.clone();
        assert_eq!(partial.collect::<Vec<_>>(), resumed.collect::<Vec<_>>());
    }

    #[test]
    fn test_exact_multiple_does_not_emit_tail() {
        // 7 chars, size 4, overlap 1: windows [0,4) and [3,7) reach the end exactly.
        let texts: Vec<&str> = chunk("abcdefg", 4, 1).unwrap().map(|w| w.text).collect();
        assert_eq!(texts, vec!["abcd", "defg"]);
    }
}
