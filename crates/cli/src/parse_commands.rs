use std::io::{self, BufRead, Write};

use {
    anyhow::{Result, bail},
    freshet_edits::NotAnEdit,
};

/// Parse `line` and render the edit as one line of JSON.
pub(crate) fn parse_to_json(line: &str) -> Result<std::result::Result<String, NotAnEdit>> {
    match freshet_edits::parse(line) {
        Ok(edit) => Ok(Ok(serde_json::to_string(&edit)?)),
        Err(reason) => Ok(Err(reason)),
    }
}

pub fn handle_parse(lines: &[String]) -> Result<()> {
    let inputs = if lines.is_empty() {
        io::stdin().lock().lines().collect::<io::Result<Vec<_>>>()?
    } else {
        lines.to_vec()
    };

    let mut stdout = io::stdout().lock();
    let mut rejected = 0;
    for (index, line) in inputs.iter().enumerate() {
        match parse_to_json(line)? {
            Ok(json) => writeln!(stdout, "{json}")?,
            Err(reason) => {
                rejected += 1;
                eprintln!("line {}: not an edit: {reason}", index + 1);
            },
        }
    }
    stdout.flush()?;

    if rejected > 0 {
        bail!("{rejected} of {} line(s) were not edits", inputs.len());
    }
    Ok(())
}
