//! Terminator-inclusive line splitting.

use drift_edits::OffsetRange;

/// One line of a document, terminator included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line<'a> {
	/// Byte range of the line within the split input.
	pub range: OffsetRange,
	/// The line's text, including its terminator if it has one.
	pub text: &'a str,
}

/// Splits on `\r\n`, `\r`, or `\n`, keeping each terminator with its line.
///
/// The concatenation of all line texts is the input. An input without a
/// trailing terminator ends with an unterminated line; an empty input is a
/// single empty line.
pub fn split_lines(text: &str) -> Vec<Line<'_>> {
	let bytes = text.as_bytes();
	let mut lines = Vec::new();
	let mut start = 0;
	let mut pos = 0;
	while pos < bytes.len() {
		let terminator = match bytes[pos] {
			b'\r' if bytes.get(pos + 1) == Some(&b'\n') => 2,
			b'\r' | b'\n' => 1,
			_ => {
				pos += 1;
				continue;
			}
		};
		let end = pos + terminator;
		lines.push(Line {
			range: OffsetRange::new(start, end),
			text: &text[start..end],
		});
		start = end;
		pos = end;
	}
	if start < text.len() || lines.is_empty() {
		lines.push(Line {
			range: OffsetRange::new(start, text.len()),
			text: &text[start..],
		});
	}
	lines
}

/// Byte offset of the start of line `index`; the input length when `index`
/// is one past the last line.
pub fn line_start_or_eof(lines: &[Line<'_>], index: usize, len: usize) -> usize {
	if index < lines.len() {
		lines[index].range.start
	} else {
		len
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn texts<'a>(lines: &[Line<'a>]) -> Vec<&'a str> {
		lines.iter().map(|l| l.text).collect()
	}

	#[test]
	fn splits_on_every_terminator_kind() {
		let lines = split_lines("a\nb\r\nc\rd");
		assert_eq!(texts(&lines), vec!["a\n", "b\r\n", "c\r", "d"]);
	}

	#[test]
	fn concatenation_reproduces_input() {
		let input = "one\ntwo\r\n\nthree\r";
		let joined: String = split_lines(input).iter().map(|l| l.text).collect();
		assert_eq!(joined, input);
	}

	#[test]
	fn trailing_terminator_has_no_phantom_line() {
		assert_eq!(texts(&split_lines("a\n")), vec!["a\n"]);
	}

	#[test]
	fn empty_input_is_one_empty_line() {
		let lines = split_lines("");
		assert_eq!(texts(&lines), vec![""]);
		assert_eq!(lines[0].range, OffsetRange::new(0, 0));
	}

	#[test]
	fn line_ranges_cover_input() {
		let lines = split_lines("ab\ncd\n");
		assert_eq!(lines[0].range, OffsetRange::new(0, 3));
		assert_eq!(lines[1].range, OffsetRange::new(3, 6));
		assert_eq!(line_start_or_eof(&lines, 2, 6), 6);
	}
}
