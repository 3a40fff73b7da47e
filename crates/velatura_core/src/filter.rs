//! Incremental removal of reasoning markup from generated text.
//!
//! Models such as deepseek-r1 wrap their chain of thought in
//! `<think>…</think>`. Upstream delivers text in fragments of arbitrary size,
//! so either marker may be split across two fragments. [`MarkupFilter`] holds
//! back just enough text to recognise a marker once the rest of it arrives.

/// Opening reasoning marker.
pub const THINK_OPEN: &str = "<think>";

/// Closing reasoning marker.
pub const THINK_CLOSE: &str = "</think>";

/// A pair of literal delimiters bracketing text that must never be emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Markers {
    open: &'static str,
    close: &'static str,
}

impl Markers {
    /// Creates a marker pair.
    ///
    /// # Panics
    ///
    /// Panics if either marker is empty.
    pub const fn new(open: &'static str, close: &'static str) -> Self {
        assert!(
            !open.is_empty() && !close.is_empty(),
            "markers must not be empty"
        );
        Self { open, close }
    }

    /// The opening marker.
    pub fn open(&self) -> &'static str {
        self.open
    }

    /// The closing marker.
    pub fn close(&self) -> &'static str {
        self.close
    }

    /// Number of trailing characters withheld after each step, since they
    /// could be the start of a marker split across fragments.
    pub fn tail_len(&self) -> usize {
        self.open
            .chars()
            .count()
            .max(self.close.chars().count())
            .saturating_sub(1)
    }
}

impl Default for Markers {
    fn default() -> Self {
        Self::new(THINK_OPEN, THINK_CLOSE)
    }
}

/// Streaming markup filter for a single response.
///
/// Feed each fragment through [`step`](Self::step) and call
/// [`finalize`](Self::finalize) once when the stream ends. A filter is
/// owned by exactly one stream; create a fresh one per response.
///
/// # Examples
///
/// ```
/// use velatura_core::MarkupFilter;
///
/// let mut filter = MarkupFilter::default();
/// let mut out = filter.step("Hello <thi");
/// out.push_str(&filter.step("nk>hmm</think>world"));
/// out.push_str(&filter.finalize());
/// assert_eq!(out, "Hello world");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkupFilter {
    markers: Markers,
    buffer: String,
}

impl MarkupFilter {
    /// Creates a filter for a custom marker pair.
    pub fn new(markers: Markers) -> Self {
        Self {
            markers,
            buffer: String::new(),
        }
    }

    /// The marker pair this filter strips.
    pub fn markers(&self) -> Markers {
        self.markers
    }

    /// Text received but not yet safe to emit.
    pub fn pending(&self) -> &str {
        &self.buffer
    }

    /// Consumes the next fragment and returns whatever can be emitted now.
    pub fn step(&mut self, text: &str) -> String {
        let Markers { open, close } = self.markers;

        let mut working = std::mem::take(&mut self.buffer);
        working.push_str(text);

        let mut output = String::new();
        let mut rest = working.as_str();

        while let Some(start) = rest.find(open) {
            let after_open = start + open.len();
            match rest[after_open..].find(close) {
                Some(offset) => {
                    output.push_str(&rest[..start]);
                    rest = &rest[after_open + offset + close.len()..];
                }
                None => {
                    // Unterminated: wait for the close marker.
                    output.push_str(&rest[..start]);
                    self.buffer = rest[start..].to_string();
                    return output;
                }
            }
        }

        let split = tail_start(rest, self.markers.tail_len());
        output.push_str(&rest[..split]);
        self.buffer = rest[split..].to_string();
        output
    }

    /// Flushes the withheld text with any stray marker literals removed.
    ///
    /// Leaves the filter empty, ready to be dropped.
    pub fn finalize(&mut self) -> String {
        std::mem::take(&mut self.buffer)
            .replace(self.markers.open, "")
            .replace(self.markers.close, "")
    }
}

/// Byte index where the last `tail` characters of `text` begin, or 0 when
/// `text` is no longer than that.
fn tail_start(text: &str, tail: usize) -> usize {
    if tail == 0 {
        return text.len();
    }
    text.char_indices()
        .rev()
        .nth(tail - 1)
        .map_or(0, |(index, _)| index)
}

/// Removes reasoning markup from a complete response.
///
/// Equivalent to one [`MarkupFilter::step`] over the whole text followed by
/// [`MarkupFilter::finalize`].
pub fn strip_markup(text: &str) -> String {
    let mut filter = MarkupFilter::default();
    let mut cleaned = filter.step(text);
    cleaned.push_str(&filter.finalize());
    cleaned
}
