//! Recursive-descent recognizers for YANG's textual sub-languages.
//!
//! Each parser consumes a prefix of its input and returns the number of
//! bytes consumed together with borrowed slices for the recognized tokens,
//! or `Err(offset)` with the byte offset of the offending character (used to
//! point error messages at the bad character). Parsers never allocate and
//! never backtrack beyond one character of lookahead.
//!
//! Grammars implemented here (RFC 7950 ABNF, JSON-flavored where noted):
//!
//! ```text
//! identifier          = (ALPHA / "_") *(ALPHA / DIGIT / "_" / "-" / ".")
//!                       ; rejected when the first three characters spell
//!                       ; "xml" in any case
//! node-identifier     = [module-name ":"] identifier
//! schema-nodeid       = absolute-schema-nodeid / descendant-schema-nodeid
//! path-arg            = absolute-path / relative-path
//! path-predicate      = "[" *WSP path-equality-expr *WSP "]"
//! path-key-expr       = current-function-invocation *WSP "/" *WSP
//!                       rel-path-keyexpr
//! instance-identifier = 1*("/" (node-identifier *predicate))
//! ```

/// A parsed `[module:]name` token pair borrowing from the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeIdent<'a> {
    pub module: Option<&'a str>,
    pub name: &'a str,
}

/// One segment of a leafref `path-arg`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathSegment<'a> {
    pub ident: NodeIdent<'a>,
    pub has_predicate: bool,
}

/// A parsed leafref `path-predicate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathPredicate<'a> {
    /// Key of the context list the predicate constrains.
    pub key: NodeIdent<'a>,
    /// The raw `path-key-expr` text, parsed incrementally by
    /// [`parse_path_key_expr`].
    pub path_key_expr: &'a str,
    /// Another `[...]` follows immediately.
    pub has_more: bool,
}

/// One segment of a JSON instance-identifier; the module name is mandatory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstSegment<'a> {
    pub module: &'a str,
    pub name: &'a str,
    pub has_predicate: bool,
}

/// A parsed instance-identifier predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataPredicate<'a> {
    pub module: Option<&'a str>,
    /// Key name, `"."` for leaf-list value, or a position (digits).
    pub name: &'a str,
    pub value: &'a str,
    pub has_more: bool,
}

/// One segment of a schema-nodeid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaNodeIdSegment<'a> {
    pub ident: NodeIdent<'a>,
    pub has_predicate: bool,
}

/// A parsed schema JSON predicate (internal format).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaJsonPredicate<'a> {
    /// Key name or `"."`.
    pub name: &'a str,
    pub value: Option<&'a str>,
    pub has_more: bool,
}

type Parsed<T> = Result<(T, usize), usize>;

fn byte(input: &str, pos: usize) -> u8 {
    input.as_bytes().get(pos).copied().unwrap_or(0)
}

fn skip_ws(input: &str, pos: &mut usize) {
    while byte(input, *pos).is_ascii_whitespace() {
        *pos += 1;
    }
}

/// Parse an identifier, returning the number of bytes consumed.
///
/// Identifiers whose first three characters spell `xml` in any case are
/// rejected at offset 0.
pub fn parse_identifier(input: &str) -> Result<usize, usize> {
    let bytes = input.as_bytes();

    if bytes.len() >= 3 && bytes[..3].eq_ignore_ascii_case(b"xml") {
        return Err(0);
    }

    let first = byte(input, 0);
    if !first.is_ascii_alphabetic() && first != b'_' {
        return Err(0);
    }

    let mut parsed = 1;
    while {
        let c = byte(input, parsed);
        c.is_ascii_alphanumeric() || c == b'_' || c == b'-' || c == b'.'
    } {
        parsed += 1;
    }

    Ok(parsed)
}

/// Parse a `[module-name ":"] identifier` pair.
pub fn parse_node_identifier(input: &str) -> Parsed<NodeIdent<'_>> {
    let first_len = parse_identifier(input)?;
    let mut pos = first_len;

    if byte(input, pos) != b':' {
        return Ok((
            NodeIdent {
                module: None,
                name: &input[..first_len],
            },
            pos,
        ));
    }
    pos += 1;

    let name_len = parse_identifier(&input[pos..]).map_err(|off| pos + off)?;
    let ident = NodeIdent {
        module: Some(&input[..first_len]),
        name: &input[pos..pos + name_len],
    };
    Ok((ident, pos + name_len))
}

/// Parse a leafref `path-predicate`:
/// `"[" *WSP node-identifier *WSP "=" *WSP path-key-expr *WSP "]"`.
pub fn parse_path_predicate(input: &str) -> Parsed<PathPredicate<'_>> {
    let mut pos = 0;

    if byte(input, pos) != b'[' {
        return Err(pos);
    }
    pos += 1;
    skip_ws(input, &mut pos);

    let (key, key_len) = parse_node_identifier(&input[pos..]).map_err(|off| pos + off)?;
    pos += key_len;
    skip_ws(input, &mut pos);

    if byte(input, pos) != b'=' {
        return Err(pos);
    }
    pos += 1;
    skip_ws(input, &mut pos);

    let close = match input[pos..].find(']') {
        Some(rel) => pos + rel,
        None => return Err(pos),
    };
    let mut pke_end = close;
    while pke_end > pos && byte(input, pke_end - 1).is_ascii_whitespace() {
        pke_end -= 1;
    }
    let path_key_expr = &input[pos..pke_end];
    pos = close + 1;

    Ok((
        PathPredicate {
            key,
            path_key_expr,
            has_more: byte(input, pos) == b'[',
        },
        pos,
    ))
}

/// Parse a `path-key-expr`. The first call (with `*parent_times == 0`)
/// consumes `current()`, every leading `..` and the first node-identifier;
/// each subsequent call continues with a single node-identifier. The
/// parent-reference count is stored into `parent_times` on the first call
/// and must not be changed between calls.
pub fn parse_path_key_expr<'a>(input: &'a str, parent_times: &mut i32) -> Parsed<NodeIdent<'a>> {
    let mut pos = 0;
    let mut par_times = 0;

    if *parent_times == 0 {
        // current-function-invocation *WSP "/" *WSP rel-path-keyexpr
        if !input.starts_with("current()") {
            return Err(pos);
        }
        pos += 9;
        skip_ws(input, &mut pos);

        if byte(input, pos) != b'/' {
            return Err(pos);
        }
        pos += 1;
        skip_ws(input, &mut pos);

        // rel-path-keyexpr
        if !input[pos..].starts_with("..") {
            return Err(pos);
        }
        par_times += 1;
        pos += 2;
        skip_ws(input, &mut pos);
    }

    // 1*(".." *WSP "/" *WSP) *(node-identifier *WSP "/" *WSP) node-identifier
    //
    // first parent reference with whitespace already consumed
    if byte(input, pos) != b'/' {
        return Err(pos);
    }
    pos += 1;
    skip_ws(input, &mut pos);

    while input[pos..].starts_with("..") && *parent_times == 0 {
        par_times += 1;
        pos += 2;
        skip_ws(input, &mut pos);

        if byte(input, pos) != b'/' {
            return Err(pos);
        }
        pos += 1;
        skip_ws(input, &mut pos);
    }

    if *parent_times == 0 {
        *parent_times = par_times;
    }

    // all parent references parsed at this point
    let (ident, len) = parse_node_identifier(&input[pos..]).map_err(|off| pos + off)?;
    Ok((ident, pos + len))
}

/// Parse one segment of a leafref `path-arg`. The first call (with
/// `*parent_times == 0`) consumes the leading `..` sequence of a relative
/// path and stores the count; `-1` marks an absolute path. Each call
/// consumes one `/ node-identifier` step and reports whether a predicate
/// follows.
pub fn parse_path_arg<'a>(input: &'a str, parent_times: &mut i32) -> Parsed<PathSegment<'a>> {
    let mut pos = 0;
    let mut par_times = 0;

    if *parent_times == 0 && input.starts_with("..") {
        par_times += 1;
        pos += 2;
        while input[pos..].starts_with("/..") {
            par_times += 1;
            pos += 3;
        }
    }

    if *parent_times == 0 {
        *parent_times = if par_times > 0 { par_times } else { -1 };
    }

    if byte(input, pos) != b'/' {
        return Err(pos);
    }
    pos += 1;

    let (ident, len) = parse_node_identifier(&input[pos..]).map_err(|off| pos + off)?;
    pos += len;

    let next = byte(input, pos);
    let has_predicate = if next == b'/' || next == 0 {
        false
    } else if next == b'[' {
        true
    } else {
        return Err(pos);
    };

    Ok((PathSegment { ident, has_predicate }, pos))
}

/// Parse one segment of an instance-identifier in JSON format. Prefixes are
/// mandatory and are module names.
pub fn parse_instance_identifier(input: &str) -> Parsed<InstSegment<'_>> {
    let mut pos = 0;

    if byte(input, pos) != b'/' {
        return Err(pos);
    }
    pos += 1;

    let (ident, len) = parse_node_identifier(&input[pos..]).map_err(|off| pos + off)?;
    let module = match ident.module {
        Some(module) => module,
        None => return Err(pos),
    };
    pos += len;

    Ok((
        InstSegment {
            module,
            name: ident.name,
            has_predicate: byte(input, pos) == b'[',
        },
        pos,
    ))
}

/// Parse an instance-identifier predicate in JSON format:
/// `"[" *WSP (node-identifier / "." / pos) *WSP "=" *WSP quoted *WSP "]"`.
///
/// A position is a non-negative integer without leading zeros (`0` itself
/// is legal, `01` is not).
pub fn parse_predicate(input: &str) -> Parsed<DataPredicate<'_>> {
    let mut pos = 0;

    if byte(input, pos) != b'[' {
        return Err(pos);
    }
    pos += 1;
    skip_ws(input, &mut pos);

    let mut module = None;
    let name;
    let first = byte(input, pos);
    if first.is_ascii_digit() {
        let start = pos;
        if first == b'0' {
            pos += 1;
            if byte(input, pos).is_ascii_digit() {
                return Err(pos);
            }
        }
        while byte(input, pos).is_ascii_digit() {
            pos += 1;
        }
        name = &input[start..pos];
    } else if first == b'.' {
        name = &input[pos..pos + 1];
        pos += 1;
    } else {
        let (ident, len) = parse_node_identifier(&input[pos..]).map_err(|off| pos + off)?;
        if ident.module.is_none() {
            return Err(pos);
        }
        module = ident.module;
        name = ident.name;
        pos += len;
    }

    skip_ws(input, &mut pos);
    if byte(input, pos) != b'=' {
        return Err(pos);
    }
    pos += 1;
    skip_ws(input, &mut pos);

    let quote = byte(input, pos);
    if quote != b'"' && quote != b'\'' {
        return Err(pos);
    }
    pos += 1;
    let close = match input[pos..].find(quote as char) {
        Some(rel) => pos + rel,
        None => return Err(pos),
    };
    let value = &input[pos..close];
    pos = close + 1;

    skip_ws(input, &mut pos);
    if byte(input, pos) != b']' {
        return Err(pos);
    }
    pos += 1;

    Ok((
        DataPredicate {
            module,
            name,
            value,
            has_more: byte(input, pos) == b'[',
        },
        pos,
    ))
}

/// Parse one segment of a schema-nodeid.
///
/// `is_relative` must be `None` on the first call and must not be changed
/// between consecutive calls; the first call decides between the absolute
/// (`/...`) and descendant (optionally `./...`) form, and continuation
/// segments always start with `/`.
pub fn parse_schema_nodeid<'a>(
    input: &'a str,
    is_relative: &mut Option<bool>,
) -> Parsed<SchemaNodeIdSegment<'a>> {
    let mut pos = 0;

    if byte(input, pos) != b'/' {
        if is_relative.is_some() {
            return Err(pos);
        }
        *is_relative = Some(true);
        if input.starts_with("./") {
            pos += 2;
        }
    } else {
        if is_relative.is_none() {
            *is_relative = Some(false);
        }
        pos += 1;
    }

    let (ident, len) = parse_node_identifier(&input[pos..]).map_err(|off| pos + off)?;
    pos += len;

    Ok((
        SchemaNodeIdSegment {
            ident,
            has_predicate: byte(input, pos) == b'[',
        },
        pos,
    ))
}

/// Parse a schema predicate in the internal JSON format:
/// `"[" *WSP ("." / identifier) [*WSP "=" *WSP quoted] *WSP "]"`.
///
/// The caller decides with `require_value` whether the value part is
/// mandatory.
pub fn parse_schema_json_predicate(
    input: &str,
    require_value: bool,
) -> Parsed<SchemaJsonPredicate<'_>> {
    let mut pos = 0;

    if byte(input, pos) != b'[' {
        return Err(pos);
    }
    pos += 1;
    skip_ws(input, &mut pos);

    let name_len = if byte(input, pos) == b'.' {
        1
    } else {
        parse_identifier(&input[pos..]).map_err(|off| pos + off)?
    };
    let name = &input[pos..pos + name_len];
    pos += name_len;
    skip_ws(input, &mut pos);

    let mut value = None;
    if byte(input, pos) == b'=' {
        pos += 1;
        skip_ws(input, &mut pos);

        let quote = byte(input, pos);
        if quote != b'"' && quote != b'\'' {
            return Err(pos);
        }
        pos += 1;
        let close = match input[pos..].find(quote as char) {
            Some(rel) => pos + rel,
            None => return Err(pos),
        };
        value = Some(&input[pos..close]);
        pos = close + 1;
        skip_ws(input, &mut pos);
    } else if require_value {
        return Err(pos);
    }

    if byte(input, pos) != b']' {
        return Err(pos);
    }
    pos += 1;

    Ok((
        SchemaJsonPredicate {
            name,
            value,
            has_more: byte(input, pos) == b'[',
        },
        pos,
    ))
}
