//! Comment stripping. Pure text transform: every newline survives and every
//! kept character stays on its original line, so spans computed on the output
//! point at the same line and column in the raw source.

/// Remove `//` line comments. `//` inside a quoted string is kept.
pub fn strip_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    let mut quote: Option<char> = None;

    while let Some(ch) = chars.next() {
        match quote {
            Some(q) => {
                out.push(ch);
                if ch == q || ch == '\n' {
                    quote = None;
                }
            }
            None => {
                if ch == '/' && chars.peek() == Some(&'/') {
                    // Blank the comment out instead of dropping it so byte offsets hold.
                    out.push(' ');
                    while let Some(&next) = chars.peek() {
                        if next == '\n' {
                            break;
                        }
                        out.extend(std::iter::repeat(' ').take(next.len_utf8()));
                        chars.next();
                    }
                } else {
                    if ch == '\'' || ch == '"' {
                        quote = Some(ch);
                    }
                    out.push(ch);
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_line_comments_and_keeps_lines() {
        let src = "main -> // entry\n  x = 1 // one\nend\n";
        let out = strip_comments(src);
        assert_eq!(out.lines().count(), src.lines().count());
        assert!(!out.contains("entry"));
        assert!(!out.contains("one"));
        assert_eq!(out.len(), src.len());
    }

    #[test]
    fn keeps_slashes_inside_strings() {
        let src = "print('http://x') // gone";
        let out = strip_comments(src);
        assert!(out.starts_with("print('http://x')"));
        assert!(!out.contains("gone"));
    }

    #[test]
    fn columns_survive() {
        let src = "// c\n  end";
        let out = strip_comments(src);
        assert_eq!(out.find("end"), src.find("end"));
    }
}
