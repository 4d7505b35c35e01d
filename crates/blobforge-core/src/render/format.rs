//! C source formatting helpers.
//!
//! Width-wrapped array literals, chunked string literals, and length
//! constants — the building blocks the emitter assembles into the final
//! source text.

/// Emits `unsigned char name[] = { 0x.., ... };` wrapped at `width` columns.
///
/// An empty buffer gets a single zero byte: `{ }` only became valid C
/// with C23.
pub fn c_array(name: &str, data: &[u8], width: usize) -> String {
    if data.is_empty() {
        return format!("unsigned char {name}[] = {{ 0 }};\n");
    }
    let head = format!("unsigned char {name}[] = {{ ");
    let indent = "  ";
    let mut lines: Vec<String> = Vec::new();
    let mut line = head;

    for (i, byte) in data.iter().enumerate() {
        let sep = if i + 1 < data.len() { ", " } else { " " };
        let token = format!("0x{byte:02x}{sep}");
        if line.len() + token.len() > width {
            lines.push(line.trim_end().to_string());
            line = format!("{indent}{token}");
        } else {
            line.push_str(&token);
        }
    }
    lines.push(line.trim_end().to_string());

    let mut out = lines.join("\n");
    out.push_str("\n};\n");
    out
}

/// Emits `const char name[] = "..." "...";` with the text escaped and
/// chunked so no line exceeds the wrap width
pub fn c_string(name: &str, text: &str, width: usize) -> String {
    let segment = width.saturating_sub(4).max(32);

    // chunk the raw text, then escape per chunk, so an escape sequence can
    // never straddle a line break
    let chars: Vec<char> = text.chars().collect();
    let body = chars
        .chunks(segment)
        .map(|chunk| format!("\"{}\"", escape_c_string(&chunk.iter().collect::<String>())))
        .collect::<Vec<_>>()
        .join("\n");

    if chars.is_empty() {
        format!("const char {name}[] = \"\";\n")
    } else {
        format!("const char {name}[] =\n{body}\n;\n")
    }
}

/// Emits `unsigned int name = value;`
pub fn uint_var(name: &str, value: u64) -> String {
    format!("unsigned int {name} = {value};\n")
}

/// Escapes backslashes and double quotes for a C string literal.
///
/// Envelope alphabets are chosen so this is a no-op for pipeline output;
/// it exists for arbitrary text pushed through the string emitter.
pub fn escape_c_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            _ => out.push(c),
        }
    }
    out
}
