//! Handles all user-facing report output.
//!
//! One line per case (`part.scad:12 ... OK`), failure details underneath, and
//! a summary per suite. Colors go through `termcolor` so they disappear when
//! stdout is not a terminal or `--no-color` is given.

use std::io::{self, Write};

use termcolor::{Color, ColorChoice, ColorSpec, NoColor, StandardStream, WriteColor};

/// Writes the pass/fail report.
pub struct Reporter {
    out: Box<dyn WriteColor>,
}

impl Reporter {
    pub fn new(out: impl WriteColor + 'static) -> Self {
        Self { out: Box::new(out) }
    }

    /// Reporter on stdout.
    pub fn stdout(use_colors: bool) -> Self {
        let choice = if use_colors {
            ColorChoice::Auto
        } else {
            ColorChoice::Never
        };
        Self::new(StandardStream::stdout(choice))
    }

    /// Reporter that discards everything.
    pub fn silent() -> Self {
        Self::new(NoColor::new(io::sink()))
    }

    pub fn suite_started(&mut self, name: &str) {
        let _ = writeln!(self.out, "Running TestSuite: {name}");
    }

    /// Starts a case line; finished by [`Reporter::case_finished`].
    pub fn case_started(&mut self, name: &str, line_nr: usize) {
        let _ = write!(self.out, "{name}:{line_nr} ... ");
        let _ = self.out.flush();
    }

    /// Ends a case line; `failure` is the detail of the single counted error.
    pub fn case_finished(&mut self, failure: Option<&str>) {
        match failure {
            None => self.colored("OK", Color::Green),
            Some(detail) => {
                let _ = writeln!(self.out, "\n{detail}");
                self.colored("NOK", Color::Red);
            }
        }
        let _ = writeln!(self.out);
    }

    pub fn suite_finished(&mut self, errors: usize) {
        let _ = writeln!(self.out);
        if errors == 0 {
            let _ = write!(self.out, "Result: ");
            self.colored("OK", Color::Green);
        } else {
            self.colored("NOK", Color::Red);
            let _ = write!(self.out, ": total errors: {errors}");
        }
        let _ = writeln!(self.out);
        let _ = self.out.flush();
    }

    fn colored(&mut self, text: &str, color: Color) {
        let _ = self
            .out
            .set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true));
        let _ = write!(self.out, "{text}");
        let _ = self.out.reset();
    }
}

impl std::fmt::Debug for Reporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Reporter")
    }
}
