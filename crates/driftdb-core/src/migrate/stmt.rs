//! SQL statement splitting.
//!
//! A small state machine over the input bytes. Only a `;` seen in the
//! default state terminates a statement; quoted strings and comment syntax
//! (`--`, `#`, `/* ... */`) are passed through untouched.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Default,
    SingleQuote,
    DoubleQuote,
    Backtick,
    LineComment,
    BlockComment,
}

/// Split SQL text into statements. Terminators are retained and
/// whitespace-only fragments are dropped; a trailing fragment without a
/// terminator is emitted as-is.
pub fn split(sql: &str) -> Vec<String> {
    let mut stmts = Vec::new();
    let mut current = String::new();
    let mut state = State::Default;
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        match state {
            State::Default => match c {
                ';' => {
                    let stmt = current.trim();
                    if !stmt.is_empty() {
                        stmts.push(stmt.to_string());
                    }
                    current.clear();
                }
                '\'' => state = State::SingleQuote,
                '"' => state = State::DoubleQuote,
                '`' => state = State::Backtick,
                '#' => state = State::LineComment,
                '-' if chars.peek() == Some(&'-') => {
                    if let Some(dash) = chars.next() {
                        current.push(dash);
                    }
                    state = State::LineComment;
                }
                '/' if chars.peek() == Some(&'*') => {
                    if let Some(star) = chars.next() {
                        current.push(star);
                    }
                    state = State::BlockComment;
                }
                _ => {}
            },
            State::SingleQuote | State::DoubleQuote => {
                let quote = if state == State::SingleQuote { '\'' } else { '"' };
                match c {
                    '\\' => {
                        if let Some(escaped) = chars.next() {
                            current.push(escaped);
                        }
                    }
                    _ if c == quote => state = State::Default,
                    _ => {}
                }
            }
            State::Backtick => {
                if c == '`' {
                    state = State::Default;
                }
            }
            State::LineComment => {
                if c == '\n' {
                    state = State::Default;
                }
            }
            State::BlockComment => {
                if c == '*' && chars.peek() == Some(&'/') {
                    if let Some(slash) = chars.next() {
                        current.push(slash);
                    }
                    state = State::Default;
                }
            }
        }
    }

    let rest = current.trim();
    if !rest.is_empty() {
        stmts.push(rest.to_string());
    }
    stmts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_simple() {
        let stmts = split("CREATE TABLE t_sub(c int);\nALTER TABLE t_sub ADD c1 int;\n");
        assert_eq!(
            stmts,
            vec!["CREATE TABLE t_sub(c int);", "ALTER TABLE t_sub ADD c1 int;"]
        );
    }

    #[test]
    fn test_split_quoted_terminator() {
        let stmts = split("INSERT INTO t VALUES ('a;b');\nINSERT INTO t VALUES (\";\");");
        assert_eq!(stmts.len(), 2);
        assert_eq!(stmts[0], "INSERT INTO t VALUES ('a;b');");
    }

    #[test]
    fn test_split_escaped_quote() {
        let stmts = split(r"INSERT INTO t VALUES ('it\'s; fine');");
        assert_eq!(stmts.len(), 1);
    }

    #[test]
    fn test_split_backtick() {
        let stmts = split("SELECT `weird;name` FROM t;");
        assert_eq!(stmts, vec!["SELECT `weird;name` FROM t;"]);
    }

    #[test]
    fn test_split_comments() {
        let stmts = split("-- header; not a terminator\nCREATE TABLE t(c int);\n# trailing; comment\nDROP TABLE t;");
        assert_eq!(stmts.len(), 2);
        assert!(stmts[0].starts_with("-- header"));
        assert!(stmts[0].ends_with("CREATE TABLE t(c int);"));
    }

    #[test]
    fn test_split_block_comment() {
        let stmts = split("CREATE /* not; here */ TABLE t(c int);");
        assert_eq!(stmts, vec!["CREATE /* not; here */ TABLE t(c int);"]);
    }

    #[test]
    fn test_split_drops_whitespace_fragments() {
        assert!(split(" \n\t ").is_empty());
        assert_eq!(split(";;;").len(), 3);
    }

    #[test]
    fn test_split_unterminated_tail() {
        let stmts = split("CREATE TABLE t(c int)");
        assert_eq!(stmts, vec!["CREATE TABLE t(c int)"]);
    }

    // Joining the split output and re-splitting is a fixed point on
    // normalized input.
    #[test]
    fn test_split_round_trip() {
        let input = "CREATE TABLE a(c int);\nINSERT INTO a VALUES (';');\nDROP TABLE a;";
        let once = split(input);
        let again = split(&once.join("\n"));
        assert_eq!(once, again);
    }
}
