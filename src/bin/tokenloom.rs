//! Command-line demo driver for the tokenloom engine
//!
//! The engine itself is grammar-free; this binary plays the caller. It
//! carries a small demo grammar (words, numbers, quoted strings and
//! parenthesized groups) and scans a file (or stdin) with it.
//!
//! Usage:
//!   tokenloom [--format tokens|tree|json] [path]
//!
//! `tokens` lists the token sequence, `tree` prints the context tree
//! indented, `json` prints the same tree as JSON.

use clap::{Arg, Command};
use once_cell::sync::Lazy;
use serde_json::{json, Value};
use std::io::Read;
use std::process;
use tokenloom::{Control, ContextTree, Engine, Error, NodeId, TreeItem};

/// Everything the demo grammar accepts between structural steps, in
/// disambiguation order.
const ITEM_IDS: &[&str] = &["SPACE", "LPAREN", "RPAREN", "STRING", "NUMBER", "WORD"];

static ITEM_CTL: Lazy<Control> = Lazy::new(|| Control::expect(ITEM_IDS.iter().copied()));

/// Build the demo engine: flat items at the top level, `(` pushes a
/// "group" context, `)` pops it, and string contents get wrapped in
/// their own "string" node without touching the stack.
fn build_engine() -> Result<Engine, Error> {
    let mut engine = Engine::new();
    engine.define_patterns(&[
        ("SPACE", r"\s+"),
        ("LPAREN", r"\("),
        ("RPAREN", r"\)"),
        ("STRING", r#""((?:[^"\\]|\\.)*)""#),
        ("NUMBER", r"([0-9]+(?:\.[0-9]+)?)"),
        ("WORD", r"([A-Za-z_][A-Za-z0-9_]*)"),
    ])?;
    engine.set_ctl_resolver(|token| {
        let ctl = ITEM_CTL.clone();
        Some(match token.pattern_id() {
            "LPAREN" => ctl.pre_push("group"),
            "RPAREN" => ctl.pre_pop("group"),
            "STRING" => ctl.wrap("string"),
            _ => ctl,
        })
    });
    engine.set_root_ctl(ITEM_CTL.clone());
    Ok(engine)
}

fn main() {
    let matches = Command::new("tokenloom")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Scans input with a small demo grammar on the tokenloom engine")
        .arg(
            Arg::new("path")
                .help("Input file; reads stdin when omitted")
                .index(1),
        )
        .arg(
            Arg::new("format")
                .long("format")
                .short('f')
                .help("Output format: 'tokens', 'tree' or 'json'")
                .default_value("tree"),
        )
        .get_matches();

    let input = match read_input(matches.get_one::<String>("path")) {
        Ok(input) => input,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let engine = match build_engine() {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let format = matches.get_one::<String>("format").unwrap();
    let outcome = match format.as_str() {
        "tokens" => print_tokens(&engine, &input),
        "tree" => print_tree(&engine, &input),
        "json" => print_json(&engine, &input),
        other => {
            eprintln!("Error: unknown format '{}'", other);
            process::exit(1);
        }
    };

    if let Err(e) = outcome {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn read_input(path: Option<&String>) -> std::io::Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path),
        None => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            Ok(buffer)
        }
    }
}

fn print_tokens(engine: &Engine, input: &str) -> Result<(), Error> {
    for step in engine.iterate(input, None, 0) {
        let token = step?;
        println!(
            "{:<8} {:>4}..{:<4} {:?}",
            token.pattern_id(),
            token.span().start,
            token.span().end,
            token.text()
        );
    }
    Ok(())
}

fn print_tree(engine: &Engine, input: &str) -> Result<(), Error> {
    let tree = engine.process(input, None, 0)?;
    print_node(&tree, tree.root(), 0);
    Ok(())
}

fn print_node(tree: &ContextTree, id: NodeId, depth: usize) {
    let indent = "  ".repeat(depth);
    println!("{}{}", indent, tree.name(id));
    if let Some(node) = tree.get(id) {
        for item in node.children() {
            match item {
                TreeItem::Context(child) => print_node(tree, *child, depth + 1),
                TreeItem::Match(record) => {
                    let groups: Vec<&str> = record
                        .groups()
                        .iter()
                        .map(|g| g.as_deref().unwrap_or("-"))
                        .collect();
                    println!("{}  {} {:?}", indent, record.pattern_id(), groups);
                }
            }
        }
    }
}

fn print_json(engine: &Engine, input: &str) -> Result<(), Error> {
    let tree = engine.process(input, None, 0)?;
    let rendered = node_to_json(&tree, tree.root());
    println!("{}", serde_json::to_string_pretty(&rendered).unwrap_or_default());
    Ok(())
}

fn node_to_json(tree: &ContextTree, id: NodeId) -> Value {
    let children: Vec<Value> = tree
        .get(id)
        .map(|node| {
            node.children()
                .iter()
                .map(|item| match item {
                    TreeItem::Context(child) => node_to_json(tree, *child),
                    TreeItem::Match(record) => json!({
                        "match": record.pattern_id(),
                        "groups": record.groups(),
                    }),
                })
                .collect()
        })
        .unwrap_or_default();
    json!({
        "context": tree.name(id).to_string(),
        "children": children,
    })
}
