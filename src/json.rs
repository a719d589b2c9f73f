use crate::ast::{Condition, Pattern};
use crate::error::{Error, Position};
use crate::value::{Branch, ResolvedModule, ResolvedSelect, ResolvedValue};

/// JSON formatting style.
#[derive(Clone, Copy)]
pub enum JsonStyle {
    /// Compact: no whitespace between tokens.
    Compact,
    /// Pretty: 2-space indented, one entry per line.
    Pretty,
}

struct JsonWriter {
    buf: String,
    style: JsonStyle,
    depth: usize,
}

impl JsonWriter {
    fn new(style: JsonStyle) -> Self {
        JsonWriter {
            buf: String::new(),
            style,
            depth: 0,
        }
    }

    fn is_pretty(&self) -> bool {
        matches!(self.style, JsonStyle::Pretty)
    }

    fn newline(&mut self) {
        if self.is_pretty() {
            self.buf.push('\n');
            for _ in 0..self.depth {
                self.buf.push_str("  ");
            }
        }
    }

    fn space(&mut self) {
        if self.is_pretty() {
            self.buf.push(' ');
        }
    }

    fn begin_object(&mut self) {
        self.buf.push('{');
        self.depth += 1;
    }

    fn end_object(&mut self, empty: bool) {
        self.depth -= 1;
        if !empty {
            self.newline();
        }
        self.buf.push('}');
    }

    /// `[a, b, ...]`, one element per line when pretty.
    fn write_seq<T>(&mut self, items: &[T], mut write_item: impl FnMut(&mut Self, &T)) {
        self.buf.push('[');
        self.depth += 1;
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.buf.push(',');
            }
            self.newline();
            write_item(self, item);
        }
        self.depth -= 1;
        if !items.is_empty() {
            self.newline();
        }
        self.buf.push(']');
    }

    fn write_module(&mut self, module: &ResolvedModule) {
        self.begin_object();
        let mut first = true;

        self.entry_sep(&mut first);
        self.write_key("type");
        self.write_string_value(&module.module_type);

        if let Some(ref name) = module.name {
            self.entry_sep(&mut first);
            self.write_key("name");
            self.write_string_value(name);
        }

        self.entry_sep(&mut first);
        self.write_key("properties");
        self.write_map(&module.properties);

        self.end_object(false);
    }

    fn write_value(&mut self, value: &ResolvedValue) {
        match value {
            ResolvedValue::Str(s) => self.write_string_value(s),
            ResolvedValue::Int(i) => self.buf.push_str(&i.to_string()),
            ResolvedValue::Bool(b) => self.buf.push_str(if *b { "true" } else { "false" }),
            ResolvedValue::List(items) => self.write_seq(items, Self::write_value),
            ResolvedValue::Map(map) => self.write_map(map),
            ResolvedValue::Select(select) => self.write_select(select),
        }
    }

    fn write_map(&mut self, map: &std::collections::BTreeMap<String, ResolvedValue>) {
        self.begin_object();

        let mut first = true;
        for (key, value) in map {
            self.entry_sep(&mut first);
            self.write_key(key);
            self.write_value(value);
        }

        self.end_object(map.is_empty());
    }

    /// `{"select": {"conditions": [...], "cases": [...], "default": ...}}`;
    /// an `unset` branch is written as `null`.
    fn write_select(&mut self, select: &ResolvedSelect) {
        self.begin_object();
        let mut outer = true;
        self.entry_sep(&mut outer);
        self.write_key("select");
        self.begin_object();

        let mut first = true;
        self.entry_sep(&mut first);
        self.write_key("conditions");
        let conditions: Vec<String> = select.conditions.iter().map(condition_text).collect();
        self.write_string_array(&conditions);

        self.entry_sep(&mut first);
        self.write_key("cases");
        self.write_seq(&select.cases, |w, case| {
            w.begin_object();
            let mut case_first = true;
            w.entry_sep(&mut case_first);
            w.write_key("patterns");
            w.buf.push('[');
            for (j, pattern) in case.patterns.iter().enumerate() {
                if j > 0 {
                    w.buf.push(',');
                }
                w.write_pattern(pattern);
            }
            w.buf.push(']');
            w.entry_sep(&mut case_first);
            w.write_key("value");
            w.write_branch(&case.value);
            w.end_object(false);
        });

        if let Some(ref branch) = select.default_branch {
            self.entry_sep(&mut first);
            self.write_key("default");
            self.write_branch(branch);
        }

        self.end_object(false);
        self.end_object(false);
    }

    fn write_branch(&mut self, branch: &Branch) {
        match branch {
            Branch::Value(value) => self.write_value(value),
            Branch::Unset => self.buf.push_str("null"),
        }
    }

    fn write_pattern(&mut self, pattern: &Pattern) {
        match pattern {
            Pattern::String(s) => self.write_string_value(s),
            Pattern::Bool(b) => self.buf.push_str(if *b { "true" } else { "false" }),
            Pattern::Any => self.write_string_value("$any"),
            Pattern::Default => self.write_string_value("$default"),
        }
    }

    fn write_string_array(&mut self, arr: &[String]) {
        self.buf.push('[');
        for (i, s) in arr.iter().enumerate() {
            if i > 0 {
                self.buf.push(',');
            }
            self.write_string_value(s);
        }
        self.buf.push(']');
    }

    fn write_position(&mut self, pos: &Position) {
        self.buf.push_str(&format!(
            "{{\"line\":{},\"column\":{},\"offset\":{}}}",
            pos.line, pos.column, pos.offset
        ));
    }

    fn entry_sep(&mut self, first: &mut bool) {
        if *first {
            *first = false;
        } else {
            self.buf.push(',');
        }
        self.newline();
    }

    fn write_key(&mut self, key: &str) {
        self.write_string_value(key);
        self.buf.push(':');
        self.space();
    }

    fn write_string_value(&mut self, s: &str) {
        self.buf.push('"');
        for ch in s.chars() {
            match ch {
                '"' => self.buf.push_str("\\\""),
                '\\' => self.buf.push_str("\\\\"),
                '\n' => self.buf.push_str("\\n"),
                '\r' => self.buf.push_str("\\r"),
                '\t' => self.buf.push_str("\\t"),
                '\u{0008}' => self.buf.push_str("\\b"),
                '\u{000C}' => self.buf.push_str("\\f"),
                c if c < '\u{0020}' => {
                    self.buf.push_str(&format!("\\u{:04x}", c as u32));
                }
                c => self.buf.push(c),
            }
        }
        self.buf.push('"');
    }
}

/// `arch()` or `soong_config_variable("ns", "var")`.
fn condition_text(condition: &Condition) -> String {
    let args: Vec<String> = condition
        .args
        .iter()
        .map(|arg| format!("\"{}\"", arg))
        .collect();
    format!("{}({})", condition.function, args.join(", "))
}

/// Serialize a single resolved value to compact JSON.
pub fn value_to_json(value: &ResolvedValue) -> String {
    let mut w = JsonWriter::new(JsonStyle::Compact);
    w.write_value(value);
    w.buf
}

/// Serialize resolved modules to a JSON array string.
pub fn modules_to_json(modules: &[ResolvedModule], style: JsonStyle) -> String {
    let mut w = JsonWriter::new(style);
    w.write_seq(modules, JsonWriter::write_module);
    w.buf
}

/// Serialize errors to a JSON array string. `begin`/`end` are present only
/// for errors that carry a source span.
pub fn errors_to_json(errors: &[Error]) -> String {
    let mut w = JsonWriter::new(JsonStyle::Compact);
    w.buf.push('[');
    for (i, err) in errors.iter().enumerate() {
        if i > 0 {
            w.buf.push(',');
        }
        w.buf.push('{');
        w.write_key("code");
        w.write_string_value(err.code());
        w.buf.push(',');
        w.write_key("message");
        w.write_string_value(&err.to_string());
        if let Some((begin, end)) = err.span() {
            w.buf.push(',');
            w.write_key("begin");
            w.write_position(&begin);
            w.buf.push(',');
            w.write_key("end");
            w.write_position(&end);
        }
        w.buf.push('}');
    }
    w.buf.push(']');
    w.buf
}
