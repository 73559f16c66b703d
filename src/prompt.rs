//! Interactive selection on standard input.

use anyhow::{bail, Context, Result};
use std::io::{BufRead, Write};
use std::ops::RangeInclusive;

/// Ask for an integer in `valid` until one is entered.
///
/// Non-numeric and out-of-range answers print a hint and ask again. End of
/// input is an error.
pub fn select<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    title: &str,
    valid: RangeInclusive<usize>,
) -> Result<usize> {
    loop {
        write!(output, "{} [{}-{}]: ", title, valid.start(), valid.end())
            .context("Failed to write prompt")?;
        output.flush().context("Failed to flush prompt")?;

        let mut line = String::new();
        let read = input.read_line(&mut line).context("Failed to read selection")?;
        if read == 0 {
            bail!("No selection made (end of input)");
        }

        let hint = match line.trim().parse::<usize>() {
            Ok(choice) if valid.contains(&choice) => return Ok(choice),
            Ok(choice) => writeln!(
                output,
                "{} is out of range, enter a number from {} to {}",
                choice,
                valid.start(),
                valid.end()
            ),
            Err(_) => writeln!(output, "'{}' is not a number", line.trim()),
        };
        hint.context("Failed to write prompt")?;
    }
}

/// Print numbered `options` (from 1) and return the chosen index (from 0).
pub fn choose<R: BufRead, W: Write, T: AsRef<str>>(
    input: &mut R,
    output: &mut W,
    title: &str,
    options: &[T],
) -> Result<usize> {
    if options.is_empty() {
        bail!("Nothing to choose from for '{}'", title);
    }
    for (i, option) in options.iter().enumerate() {
        writeln!(output, "  {}: {}", i + 1, option.as_ref()).context("Failed to write prompt")?;
    }
    Ok(select(input, output, title, 1..=options.len())? - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn accepts_valid_choice() {
        let mut input = Cursor::new("2\n");
        let mut output = Vec::new();
        assert_eq!(select(&mut input, &mut output, "Mode", 1..=3).unwrap(), 2);
        assert_eq!(String::from_utf8(output).unwrap(), "Mode [1-3]: ");
    }

    #[test]
    fn reprompts_until_valid() {
        let mut input = Cursor::new("abc\n7\n\n 3 \n");
        let mut output = Vec::new();
        assert_eq!(select(&mut input, &mut output, "Mode", 1..=3).unwrap(), 3);

        let printed = String::from_utf8(output).unwrap();
        assert_eq!(printed.matches("Mode [1-3]: ").count(), 4);
        assert!(printed.contains("'abc' is not a number"));
        assert!(printed.contains("7 is out of range"));
    }

    #[test]
    fn end_of_input_is_an_error() {
        let mut input = Cursor::new("9\n");
        let mut output = Vec::new();
        let err = select(&mut input, &mut output, "Mode", 1..=2).unwrap_err();
        assert!(err.to_string().contains("end of input"));
    }

    #[test]
    fn choose_lists_options_and_returns_index() {
        let mut input = Cursor::new("3\n");
        let mut output = Vec::new();
        let options = ["spectrum", "spectrogram", "cepstrum"];
        assert_eq!(choose(&mut input, &mut output, "Analysis", &options).unwrap(), 2);
        let printed = String::from_utf8(output).unwrap();
        assert!(printed.starts_with("  1: spectrum\n  2: spectrogram\n  3: cepstrum\n"));
    }

    #[test]
    fn choose_from_nothing_fails() {
        let mut input = Cursor::new("1\n");
        let mut output = Vec::new();
        let empty: [&str; 0] = [];
        assert!(choose(&mut input, &mut output, "Device", &empty).is_err());
    }
}
