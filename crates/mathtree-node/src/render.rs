//! String and TeX rendering.
//!
//! Both renderings are pure functions of the tree. Parentheses are inserted
//! from operator precedence only, so rendering the same tree twice always
//! yields the same text.

use crate::node::Node;
use crate::variants::{Constant, OperatorNode};
use std::fmt;

const ATOM: u8 = 100;
const POSTFIX: u8 = 16;
const POWER: u8 = 15;
const UNARY: u8 = 14;
const RANGE: u8 = 11;
const CONDITIONAL: u8 = 1;
const STATEMENT: u8 = 0;

const GREEK: &[&str] = &[
    "alpha", "beta", "gamma", "delta", "epsilon", "zeta", "eta", "theta", "iota", "kappa",
    "lambda", "mu", "nu", "xi", "pi", "rho", "sigma", "tau", "upsilon", "phi", "chi", "psi",
    "omega", "Gamma", "Delta", "Theta", "Lambda", "Xi", "Pi", "Sigma", "Upsilon", "Phi", "Psi",
    "Omega",
];

fn is_postfix(op: &OperatorNode) -> bool {
    op.is_unary() && matches!(op.op.as_str(), "'" | "!")
}

fn binary_precedence(op: &str) -> u8 {
    match op {
        "or" | "||" => 2,
        "xor" => 3,
        "and" | "&&" => 4,
        "|" => 5,
        "^|" => 6,
        "&" => 7,
        "==" | "!=" | "<" | ">" | "<=" | ">=" => 8,
        "<<" | ">>" | ">>>" => 9,
        "to" | "in" => 10,
        "+" | "-" => 12,
        "*" | "/" | ".*" | "./" | "%" | "mod" => 13,
        "^" | ".^" => POWER,
        _ => 12,
    }
}

fn operator_precedence(op: &OperatorNode) -> u8 {
    if is_postfix(op) {
        POSTFIX
    } else if op.is_unary() {
        UNARY
    } else if op.implicit {
        13
    } else {
        binary_precedence(&op.op)
    }
}

fn precedence(node: &Node) -> u8 {
    match node {
        Node::Operator(op) => operator_precedence(op),
        Node::Range(_) => RANGE,
        Node::Conditional(_) => CONDITIONAL,
        Node::Assignment(_)
        | Node::FunctionAssignment(_)
        | Node::Update(_)
        | Node::Block(_) => STATEMENT,
        _ => ATOM,
    }
}

fn right_associative(op: &str) -> bool {
    matches!(op, "^" | ".^")
}

fn format_number(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        let text = if value > 0.0 { "Infinity" } else { "-Infinity" };
        text.to_string()
    } else if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

fn join<'a>(nodes: impl IntoIterator<Item = &'a Node>, render: fn(&Node) -> String, sep: &str) -> String {
    nodes.into_iter().map(render).collect::<Vec<_>>().join(sep)
}

// ---------------------------------------------------------------------------
// plain text
// ---------------------------------------------------------------------------

fn text_paren(node: &Node, needs: bool) -> String {
    let inner = text(node);
    if needs {
        format!("({inner})")
    } else {
        inner
    }
}

fn text_operator(op: &OperatorNode) -> String {
    let own = operator_precedence(op);
    match op.args.as_slice() {
        [arg] if is_postfix(op) => format!("{}{}", text_paren(arg, precedence(arg) < own), op.op),
        [arg] => {
            let sep = if op.op.chars().all(char::is_alphabetic) { " " } else { "" };
            format!("{}{sep}{}", op.op, text_paren(arg, precedence(arg) < own))
        }
        [lhs, rhs] => {
            let right = right_associative(&op.op);
            let lp = precedence(lhs);
            let rp = precedence(rhs);
            let l = text_paren(lhs, lp < own || (lp == own && right));
            let r = text_paren(rhs, rp < own || (rp == own && !right));
            if op.implicit {
                format!("{l} {r}")
            } else {
                format!("{l} {} {r}", op.op)
            }
        }
        args => format!("{}({})", op.fn_name, join(args, text, ", ")),
    }
}

pub(crate) fn text(node: &Node) -> String {
    match node {
        Node::Constant(c) => match &c.value {
            Constant::Number(n) => format_number(*n),
            Constant::String(s) => format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
            Constant::Boolean(b) => b.to_string(),
            Constant::Null => "null".to_string(),
        },
        Node::Symbol(s) => s.name.clone(),
        Node::Operator(op) => text_operator(op),
        Node::Function(f) => format!("{}({})", f.name(), join(&f.args, text, ", ")),
        Node::Array(a) => format!("[{}]", join(&a.items, text, ", ")),
        Node::Assignment(a) => format!("{} = {}", a.name, text(&a.expr)),
        Node::Block(b) => b
            .blocks
            .iter()
            .map(|entry| {
                let line = text(&entry.node);
                if entry.visible {
                    line
                } else {
                    format!("{line};")
                }
            })
            .collect::<Vec<_>>()
            .join("\n"),
        Node::Conditional(c) => format!(
            "{} ? {} : {}",
            text_paren(&c.condition, precedence(&c.condition) <= CONDITIONAL),
            text_paren(&c.true_expr, precedence(&c.true_expr) < CONDITIONAL),
            text_paren(&c.false_expr, precedence(&c.false_expr) < CONDITIONAL),
        ),
        Node::FunctionAssignment(f) => {
            format!("{}({}) = {}", f.name, f.params.join(", "), text(&f.expr))
        }
        Node::Index(i) => format!(
            "{}[{}]",
            text_paren(&i.object, precedence(&i.object) < ATOM),
            join(&i.dimensions, text, ", ")
        ),
        Node::Range(r) => {
            let part = |n: &Node| text_paren(n, precedence(n) <= RANGE);
            match &r.step {
                Some(step) => format!("{}:{}:{}", part(&r.start), part(step), part(&r.end)),
                None => format!("{}:{}", part(&r.start), part(&r.end)),
            }
        }
        Node::Update(u) => format!("{} = {}", text(u.index_node()), text(&u.expr)),
    }
}

// ---------------------------------------------------------------------------
// TeX
// ---------------------------------------------------------------------------

fn tex_paren(node: &Node, needs: bool) -> String {
    let inner = tex(node);
    if needs {
        format!("\\left({inner}\\right)")
    } else {
        inner
    }
}

fn tex_symbol(name: &str) -> String {
    if GREEK.contains(&name) {
        format!("\\{name}")
    } else if name.chars().count() == 1 {
        name.to_string()
    } else {
        format!("\\mathrm{{{name}}}")
    }
}

fn tex_binary_op(op: &str) -> &str {
    match op {
        "*" | ".*" => "\\cdot",
        "==" => "=",
        "!=" => "\\neq",
        "<=" => "\\leq",
        ">=" => "\\geq",
        "and" | "&&" => "\\wedge",
        "or" | "||" => "\\vee",
        "xor" => "\\veebar",
        "%" | "mod" => "\\mod",
        "to" => "\\rightarrow",
        other => other,
    }
}

fn tex_operator(op: &OperatorNode) -> String {
    let own = operator_precedence(op);
    match op.args.as_slice() {
        [arg] if op.op == "'" => format!("{{{}}}^\\top", tex_paren(arg, precedence(arg) < own)),
        [arg] if is_postfix(op) => format!("{}{}", tex_paren(arg, precedence(arg) < own), op.op),
        [arg] => {
            let symbol = match op.op.as_str() {
                "not" | "!" => "\\neg ",
                other => other,
            };
            format!("{symbol}{}", tex_paren(arg, precedence(arg) < own))
        }
        [lhs, rhs] if op.op == "/" => format!("\\frac{{{}}}{{{}}}", tex(lhs), tex(rhs)),
        [lhs, rhs] if right_associative(&op.op) => format!(
            "{{{}}}^{{{}}}",
            tex_paren(lhs, precedence(lhs) <= own),
            tex(rhs)
        ),
        [lhs, rhs] => {
            let lp = precedence(lhs);
            let rp = precedence(rhs);
            let l = tex_paren(lhs, lp < own);
            let r = tex_paren(rhs, rp <= own && !matches!(op.op.as_str(), "+" | "*"));
            let symbol = tex_binary_op(&op.op);
            if op.implicit {
                format!("{l}~{r}")
            } else if symbol.starts_with('\\') {
                format!("{l}{symbol} {r}")
            } else {
                format!("{l}{symbol}{r}")
            }
        }
        args => format!(
            "\\mathrm{{{}}}\\left({}\\right)",
            op.fn_name,
            join(args, tex, ",")
        ),
    }
}

fn tex_matrix(rows: &[String]) -> String {
    format!("\\begin{{bmatrix}}{}\\end{{bmatrix}}", rows.join("\\\\"))
}

pub(crate) fn tex(node: &Node) -> String {
    match node {
        Node::Constant(c) => match &c.value {
            Constant::Number(n) => match format_number(*n).as_str() {
                "Infinity" => "\\infty".to_string(),
                "-Infinity" => "-\\infty".to_string(),
                other => other.to_string(),
            },
            Constant::String(s) => format!("\\mathtt{{\"{s}\"}}"),
            Constant::Boolean(b) => format!("\\mathrm{{{b}}}"),
            Constant::Null => "\\mathrm{null}".to_string(),
        },
        Node::Symbol(s) => tex_symbol(&s.name),
        Node::Operator(op) => tex_operator(op),
        Node::Function(f) => match (f.name(), f.args.as_slice()) {
            ("sqrt", [arg]) => format!("\\sqrt{{{}}}", tex(arg)),
            ("abs", [arg]) => format!("\\left|{}\\right|", tex(arg)),
            (name, args) => format!("{}\\left({}\\right)", tex_symbol(name), join(args, tex, ",")),
        },
        Node::Array(a) => {
            let rows: Vec<String> = if a.items.iter().all(|item| matches!(item, Node::Array(_)))
                && !a.items.is_empty()
            {
                a.items
                    .iter()
                    .map(|row| join(row.children(), tex, "&"))
                    .collect()
            } else {
                a.items.iter().map(tex).collect()
            };
            tex_matrix(&rows)
        }
        Node::Assignment(a) => format!("{}:={}", tex_symbol(&a.name), tex(&a.expr)),
        Node::Block(b) => b
            .blocks
            .iter()
            .map(|entry| tex(&entry.node))
            .collect::<Vec<_>>()
            .join("\\;\\;\n"),
        Node::Conditional(c) => format!(
            "\\begin{{cases}} {{{}}}, &\\quad{{\\text{{if }}\\;{}}}\\\\{{{}}}, &\\quad{{\\text{{otherwise}}}}\\end{{cases}}",
            tex(&c.true_expr),
            tex(&c.condition),
            tex(&c.false_expr)
        ),
        Node::FunctionAssignment(f) => format!(
            "{}\\left({}\\right):={}",
            tex_symbol(&f.name),
            f.params
                .iter()
                .map(|p| tex_symbol(p))
                .collect::<Vec<_>>()
                .join(","),
            tex(&f.expr)
        ),
        Node::Index(i) => format!(
            "{}_{{\\left[{}\\right]}}",
            tex_paren(&i.object, precedence(&i.object) < ATOM),
            join(&i.dimensions, tex, ",")
        ),
        Node::Range(r) => {
            let part = |n: &Node| tex_paren(n, precedence(n) <= RANGE);
            match &r.step {
                Some(step) => format!("{}:{}:{}", part(&r.start), part(step), part(&r.end)),
                None => format!("{}:{}", part(&r.start), part(&r.end)),
            }
        }
        Node::Update(u) => format!("{}:={}", tex(u.index_node()), tex(&u.expr)),
    }
}

impl Node {
    pub fn to_tex(&self) -> String {
        tex(self)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&text(self))
    }
}
