// Key repair - quotes bare object keys and strips trailing commas so that
// near-JSON emitted by an LLM parses
//
// Both passes scan character by character and track string state, so quoted
// keys, and colons or commas inside string literals, are never touched. Each
// pass is idempotent: running it on its own output changes nothing.

/// Repairs identifier-like unquoted keys and trailing commas
pub struct KeyRepairer;

impl KeyRepairer {
    pub fn new() -> Self {
        KeyRepairer
    }

    /// Full repair: quote bare keys, then drop trailing commas
    pub fn repair(&self, input: &str) -> String {
        strip_trailing_commas(&quote_bare_keys(input))
    }
}

impl Default for KeyRepairer {
    fn default() -> Self {
        KeyRepairer::new()
    }
}

/// Wrap unquoted identifier-like keys in double quotes.
///
/// A bare key is a run of word characters (Unicode letters, digits, `_`)
/// sitting after `{` or `,` (plus whitespace) and followed by `:`. Anything
/// inside a string literal is copied through untouched.
pub fn quote_bare_keys(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len() + 16);
    let mut i = 0;
    let mut in_string = false;

    while i < chars.len() {
        let c = chars[i];

        if in_string {
            out.push(c);
            if c == '\\' && i + 1 < chars.len() {
                out.push(chars[i + 1]);
                i += 2;
                continue;
            }
            if c == '"' {
                in_string = false;
            }
            i += 1;
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
                i += 1;
            }
            '{' | ',' => {
                out.push(c);
                i += 1;
                while i < chars.len() && chars[i].is_whitespace() {
                    out.push(chars[i]);
                    i += 1;
                }
                let start = i;
                let mut end = i;
                while end < chars.len() && is_key_char(chars[end]) {
                    end += 1;
                }
                if end > start {
                    let mut after = end;
                    while after < chars.len() && chars[after].is_whitespace() {
                        after += 1;
                    }
                    if after < chars.len() && chars[after] == ':' {
                        out.push('"');
                        out.extend(&chars[start..end]);
                        out.push('"');
                        i = end;
                    }
                }
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    out
}

/// Remove commas whose next non-whitespace character closes a container
pub fn strip_trailing_commas(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut i = 0;
    let mut in_string = false;

    while i < chars.len() {
        let c = chars[i];

        if in_string {
            out.push(c);
            if c == '\\' && i + 1 < chars.len() {
                out.push(chars[i + 1]);
                i += 2;
                continue;
            }
            if c == '"' {
                in_string = false;
            }
            i += 1;
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
                i += 1;
            }
            ',' => {
                let mut next = i + 1;
                while next < chars.len() && chars[next].is_whitespace() {
                    next += 1;
                }
                if next < chars.len() && (chars[next] == '}' || chars[next] == ']') {
                    // drop the comma, keep the whitespace
                    i += 1;
                } else {
                    out.push(c);
                    i += 1;
                }
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    out
}

fn is_key_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}
