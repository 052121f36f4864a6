//! `go.mod` parsing and in-place editing
//!
//! The manifest keeps every raw line of the file. Parsing extracts the
//! module identity, the `require` entries and the `replace` entries, each
//! replace remembering the line it came from. Edits touch only the lines of
//! the replaces being changed, so rendering an unmodified manifest gives back
//! the original bytes and everything crosslink does not own (comments,
//! `exclude`, `retract`, `toolchain`, ...) survives verbatim.
//!
//! # Example
//!
//! ```
//! use crosslink_core::manifest::Manifest;
//! use std::path::Path;
//!
//! let text = "module example.com/root\n\ngo 1.20\n\nrequire example.com/root/a v1.0.0\n";
//! let mut manifest = Manifest::parse(Path::new("go.mod"), text).unwrap();
//! assert_eq!(manifest.module(), "example.com/root");
//!
//! manifest.add_replace("example.com/root/a", "./a");
//! assert!(manifest.render().ends_with("replace example.com/root/a => ./a\n"));
//! ```

use crate::error::{CrosslinkError, Result};
use std::path::Path;

/// Directives that accept the `verb ( ... )` block form
const BLOCK_VERBS: &[&str] = &["require", "replace", "exclude", "retract", "godebug", "tool", "ignore"];

/// A `require` entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Require {
    pub path: String,
    pub version: String,
    /// Marked `// indirect`
    pub indirect: bool,
}

/// A `replace` entry: `old [version] => new [version]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replace {
    pub old_path: String,
    pub old_version: Option<String>,
    pub new_path: String,
    pub new_version: Option<String>,
    /// Index into `Manifest::lines`
    line: usize,
    /// Index into `Manifest::blocks` when declared inside `replace ( ... )`
    block: Option<usize>,
}

/// Line span of a `replace ( ... )` block
#[derive(Debug, Clone, Copy)]
struct Block {
    open: usize,
    close: usize,
}

/// A parsed `go.mod` file
#[derive(Debug, Clone)]
pub struct Manifest {
    lines: Vec<String>,
    trailing_newline: bool,
    module: String,
    requires: Vec<Require>,
    replaces: Vec<Replace>,
    /// `None` once a block has been emptied and removed
    blocks: Vec<Option<Block>>,
}

impl Manifest {
    /// Parse manifest text; `path` is only used for error reporting
    pub fn parse(path: &Path, text: &str) -> Result<Self> {
        let mut lines: Vec<String> = text.split('\n').map(str::to_string).collect();
        let trailing_newline = text.ends_with('\n');
        if trailing_newline {
            lines.pop();
        }

        let mut module: Option<String> = None;
        let mut requires = Vec::new();
        let mut replaces = Vec::new();
        let mut blocks = Vec::new();

        // (verb, line index of the opening line)
        let mut open_block: Option<(String, usize)> = None;

        for (idx, raw) in lines.iter().enumerate() {
            let line_no = idx + 1;
            let (code, comment) = split_comment(raw);
            let tokens = tokenize(code);

            if let Some((verb, open)) = &open_block {
                if tokens.len() == 1 && tokens[0] == ")" {
                    if verb == "replace" {
                        blocks.push(Some(Block { open: *open, close: idx }));
                    }
                    open_block = None;
                    continue;
                }
                if tokens.is_empty() {
                    continue;
                }
                match verb.as_str() {
                    "require" => requires.push(parse_require(path, line_no, &tokens, comment)?),
                    "replace" => {
                        let mut replace = parse_replace(path, line_no, &tokens)?;
                        replace.line = idx;
                        replace.block = Some(blocks.len());
                        replaces.push(replace);
                    }
                    _ => {}
                }
                continue;
            }

            let Some(verb) = tokens.first() else {
                continue;
            };
            let args = &tokens[1..];

            if BLOCK_VERBS.contains(&verb.as_str()) && args.first().map(String::as_str) == Some("(") {
                match args.len() {
                    1 => open_block = Some((verb.clone(), idx)),
                    // `replace ( )` on one line
                    2 if args[1] == ")" => {}
                    _ => return Err(CrosslinkError::parse(path, line_no, format!("unexpected tokens after `{verb} (`"))),
                }
                continue;
            }

            match verb.as_str() {
                "module" => {
                    if module.is_some() {
                        return Err(CrosslinkError::parse(path, line_no, "repeated module directive"));
                    }
                    if args.len() != 1 {
                        return Err(CrosslinkError::parse(path, line_no, "usage: module module/path"));
                    }
                    module = Some(args[0].clone());
                }
                "go" => {
                    if args.len() != 1 {
                        return Err(CrosslinkError::parse(path, line_no, "usage: go 1.23"));
                    }
                }
                "require" => requires.push(parse_require(path, line_no, args, comment)?),
                "replace" => {
                    let mut replace = parse_replace(path, line_no, args)?;
                    replace.line = idx;
                    replaces.push(replace);
                }
                "toolchain" | "exclude" | "retract" | "godebug" | "tool" | "ignore" => {
                    if args.is_empty() {
                        return Err(CrosslinkError::parse(path, line_no, format!("missing arguments to {verb}")));
                    }
                }
                other => {
                    return Err(CrosslinkError::parse(path, line_no, format!("unknown directive: {other}")));
                }
            }
        }

        if let Some((verb, open)) = open_block {
            return Err(CrosslinkError::parse(path, open + 1, format!("unterminated {verb} block")));
        }

        let module = module.ok_or_else(|| CrosslinkError::parse(path, 1, "missing module directive"))?;

        Ok(Self {
            lines,
            trailing_newline,
            module,
            requires,
            replaces,
            blocks,
        })
    }

    /// Declared module identity
    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn requires(&self) -> &[Require] {
        &self.requires
    }

    pub fn replaces(&self) -> &[Replace] {
        &self.replaces
    }

    /// First replace whose old path is `old_path`
    pub fn replace_for(&self, old_path: &str) -> Option<&Replace> {
        self.replaces.iter().find(|r| r.old_path == old_path)
    }

    /// Append `replace old_path => new_path`
    ///
    /// Consecutive appends are grouped; a blank line separates the group
    /// from preceding content that is not itself a single-line replace.
    pub fn add_replace(&mut self, old_path: &str, new_path: &str) {
        let eol = if self.uses_crlf() { "\r" } else { "" };
        if !eol.is_empty() && !self.trailing_newline {
            if let Some(last) = self.lines.last_mut().filter(|l| !l.ends_with('\r')) {
                last.push('\r');
            }
        }

        let last_is_replace = self
            .replaces
            .iter()
            .any(|r| r.block.is_none() && r.line + 1 == self.lines.len());
        let last_is_blank = self.lines.last().map_or(true, |l| l.trim().is_empty());
        if !last_is_replace && !last_is_blank {
            self.lines.push(eol.to_string());
        }

        let replace = Replace {
            old_path: old_path.to_string(),
            old_version: None,
            new_path: new_path.to_string(),
            new_version: None,
            line: self.lines.len(),
            block: None,
        };
        self.lines.push(format!("replace {}{eol}", format_replace(&replace)));
        self.replaces.push(replace);
        self.trailing_newline = true;
    }

    /// Point the first replace for `old_path` at `new_path`
    ///
    /// Indentation, block membership, the old version and any trailing
    /// comment are preserved. Returns `false` when no such replace exists.
    pub fn set_replace_path(&mut self, old_path: &str, new_path: &str) -> bool {
        let Some(replace) = self.replaces.iter_mut().find(|r| r.old_path == old_path) else {
            return false;
        };
        replace.new_path = new_path.to_string();
        replace.new_version = None;

        let raw = &self.lines[replace.line];
        let carriage_return = raw.ends_with('\r');
        let indent: String = raw.chars().take_while(|c| c.is_whitespace()).collect();
        let (_, comment) = split_comment(raw);

        let mut line = indent;
        if replace.block.is_none() {
            line.push_str("replace ");
        }
        line.push_str(&format_replace(replace));
        if let Some(comment) = comment {
            line.push(' ');
            line.push_str(comment.trim_end_matches('\r'));
        }
        if carriage_return {
            line.push('\r');
        }
        self.lines[replace.line] = line;
        true
    }

    /// Remove every replace for `old_path`
    ///
    /// A `replace ( ... )` block left without entries is removed as well.
    /// Returns whether anything was removed.
    pub fn drop_replace(&mut self, old_path: &str) -> bool {
        let mut removed = false;
        while let Some(pos) = self.replaces.iter().position(|r| r.old_path == old_path) {
            let replace = self.replaces.remove(pos);
            self.remove_line(replace.line);
            removed = true;

            match replace.block {
                None => self.collapse_blank_at(replace.line),
                Some(block_idx) => {
                    let still_used = self.replaces.iter().any(|r| r.block == Some(block_idx));
                    if !still_used {
                        if let Some(block) = self.blocks[block_idx].take() {
                            self.remove_line(block.close);
                            self.remove_line(block.open);
                            self.collapse_blank_at(block.open);
                        }
                    }
                }
            }
        }
        removed
    }

    /// Manifest text, byte-identical to the input when nothing was edited
    pub fn render(&self) -> String {
        let mut out = self.lines.join("\n");
        if self.trailing_newline {
            out.push('\n');
        }
        out
    }

    /// Whether the file's line endings are `\r\n`, judged by its first line
    fn uses_crlf(&self) -> bool {
        self.lines.first().is_some_and(|l| l.ends_with('\r'))
    }

    /// After a removal at `idx`, drop a blank line left doubled or trailing
    fn collapse_blank_at(&mut self, idx: usize) {
        let is_blank = |line: &String| line.trim().is_empty();
        if idx == 0 || !is_blank(&self.lines[idx - 1]) {
            return;
        }
        if idx == self.lines.len() {
            self.remove_line(idx - 1);
        } else if is_blank(&self.lines[idx]) {
            self.remove_line(idx);
        }
    }

    fn remove_line(&mut self, idx: usize) {
        self.lines.remove(idx);
        for replace in &mut self.replaces {
            if replace.line > idx {
                replace.line -= 1;
            }
        }
        for block in self.blocks.iter_mut().flatten() {
            if block.open > idx {
                block.open -= 1;
            }
            if block.close > idx {
                block.close -= 1;
            }
        }
    }
}

fn parse_require(path: &Path, line_no: usize, args: &[String], comment: Option<&str>) -> Result<Require> {
    if args.len() != 2 {
        return Err(CrosslinkError::parse(path, line_no, "usage: require module/path v1.2.3"));
    }
    let indirect = comment
        .map(|c| c.trim_start_matches('/').trim().starts_with("indirect"))
        .unwrap_or(false);
    Ok(Require {
        path: args[0].clone(),
        version: args[1].clone(),
        indirect,
    })
}

fn parse_replace(path: &Path, line_no: usize, args: &[String]) -> Result<Replace> {
    let usage = "usage: replace module/path [v1.2.3] => other/module v1.4 | replace module/path [v1.2.3] => ../local/directory";
    let Some(arrow) = args.iter().position(|t| t == "=>") else {
        return Err(CrosslinkError::parse(path, line_no, usage));
    };
    let (old, new) = (&args[..arrow], &args[arrow + 1..]);
    if old.is_empty() || old.len() > 2 || new.is_empty() || new.len() > 2 {
        return Err(CrosslinkError::parse(path, line_no, usage));
    }
    Ok(Replace {
        old_path: old[0].clone(),
        old_version: old.get(1).cloned(),
        new_path: new[0].clone(),
        new_version: new.get(1).cloned(),
        line: 0,
        block: None,
    })
}

fn format_replace(replace: &Replace) -> String {
    let mut out = quote(&replace.old_path);
    if let Some(version) = &replace.old_version {
        out.push(' ');
        out.push_str(version);
    }
    out.push_str(" => ");
    out.push_str(&quote(&replace.new_path));
    if let Some(version) = &replace.new_version {
        out.push(' ');
        out.push_str(version);
    }
    out
}

fn quote(token: &str) -> String {
    if token.is_empty() || token.chars().any(char::is_whitespace) {
        format!("\"{token}\"")
    } else {
        token.to_string()
    }
}

/// Split a raw line into code and a `//` comment, ignoring `//` inside quotes
fn split_comment(raw: &str) -> (&str, Option<&str>) {
    let mut quote: Option<char> = None;
    let mut prev_slash = false;
    for (i, c) in raw.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '`' => quote = Some(c),
            None if c == '/' && prev_slash => return (&raw[..i - 1], Some(&raw[i - 1..])),
            None => {}
        }
        prev_slash = quote.is_none() && c == '/';
    }
    (raw, None)
}

/// Whitespace-separated tokens; `"..."` and `` `...` `` group and are unquoted
fn tokenize(code: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut quoted = false;

    for c in code.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None if c == '"' || c == '`' => {
                quote = Some(c);
                quoted = true;
            }
            None if c.is_whitespace() => {
                if !current.is_empty() || quoted {
                    tokens.push(std::mem::take(&mut current));
                    quoted = false;
                }
            }
            None => current.push(c),
        }
    }
    if !current.is_empty() || quoted {
        tokens.push(current);
    }
    tokens
}
