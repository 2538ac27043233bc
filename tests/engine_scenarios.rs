//! End-to-end scan scenarios driving the public engine API
//!
//! Each scenario builds a tiny grammar the way a real caller would:
//! registered patterns, a resolver closure encoding the transitions,
//! and assertions on the token sequence, the context tree, or the
//! error shape.

use tokenloom::{Control, ContextTree, Engine, Error, MatchRecord, TreeItem};

/// WORD/SPACE alternation over `"ab cd"`: the happy path.
fn alternating_engine() -> Engine {
    let mut engine = Engine::new();
    engine
        .define_patterns(&[("WORD", "([a-zA-Z]+)"), ("SPACE", r"(\s+)")])
        .unwrap();
    engine.set_ctl_resolver(|token| {
        Some(match token.pattern_id() {
            "WORD" => Control::expect(["SPACE"]),
            _ => Control::expect(["WORD"]),
        })
    });
    engine.set_root_ctl(Control::expect(["WORD"]));
    engine
}

/// Parenthesis grammar: `(` pushes a "paren" context, `)` pops it.
fn paren_engine() -> Engine {
    let mut engine = Engine::new();
    engine
        .define_patterns(&[
            ("OPEN", r"\("),
            ("CLOSE", r"\)"),
            ("WORD", "([a-zA-Z]+)"),
            ("SPACE", r"\s+"),
        ])
        .unwrap();
    engine.set_ctl_resolver(|token| {
        let main = Control::expect(["SPACE", "OPEN", "CLOSE", "WORD"]);
        Some(match token.pattern_id() {
            "OPEN" => main.pre_push("paren"),
            "CLOSE" => main.pre_pop("paren"),
            _ => main,
        })
    });
    engine.set_root_ctl(Control::expect(["SPACE", "OPEN", "WORD"]));
    engine
}

fn root_records(tree: &ContextTree) -> Vec<&MatchRecord> {
    tree.get(tree.root())
        .unwrap()
        .children()
        .iter()
        .filter_map(|item| match item {
            TreeItem::Match(record) => Some(record),
            TreeItem::Context(_) => None,
        })
        .collect()
}

#[test]
fn happy_path_token_sequence() {
    let engine = alternating_engine();
    let tokens: Vec<(String, String)> = engine
        .iterate("ab cd", None, 0)
        .map(|step| step.map(|t| (t.pattern_id().to_string(), t.text().to_string())))
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(
        tokens,
        vec![
            ("WORD".to_string(), "ab".to_string()),
            ("SPACE".to_string(), " ".to_string()),
            ("WORD".to_string(), "cd".to_string()),
        ]
    );
}

#[test]
fn happy_path_tree_shape() {
    let engine = alternating_engine();
    let tree = engine.process("ab cd", None, 0).unwrap();
    let records = root_records(&tree);
    assert_eq!(records.len(), 3);
    let groups: Vec<Option<&str>> = records.iter().map(|r| r.group(0)).collect();
    assert_eq!(groups, vec![Some("ab"), Some(" "), Some("cd")]);
}

#[test]
fn unexpected_token_reports_position_and_window() {
    let mut engine = Engine::new();
    engine.define_patterns(&[("A", "a")]).unwrap();
    engine.set_ctl_resolver(|_| Some(Control::expect(["A"])));
    engine.set_root_ctl(Control::expect(["A"]));

    let err = engine.process("ab", None, 0).unwrap_err();
    match err {
        Error::UnexpectedToken {
            position,
            window,
            previous,
            expected,
        } => {
            assert_eq!(position.line, 1);
            assert_eq!(position.column, 2);
            assert_eq!(position.offset, 1);
            assert_eq!(window, "a<HERE>b");
            assert_eq!(previous.as_deref(), Some("A"));
            assert_eq!(expected, vec!["A".to_string()]);
        }
        other => panic!("expected UnexpectedToken, got {:?}", other),
    }
}

#[test]
fn unexpected_token_position_spans_lines() {
    let mut engine = Engine::new();
    engine
        .define_patterns(&[("LINE", r"[a-z]+\n")])
        .unwrap();
    engine.set_ctl_resolver(|_| Some(Control::expect(["LINE"])));
    engine.set_root_ctl(Control::expect(["LINE"]));

    let err = engine.process("ab\ncd\n!\n", None, 0).unwrap_err();
    match err {
        Error::UnexpectedToken { position, .. } => {
            assert_eq!(position.line, 3);
            assert_eq!(position.column, 1);
            assert_eq!(position.offset, 6);
        }
        other => panic!("expected UnexpectedToken, got {:?}", other),
    }
}

#[test]
fn nested_context_tree() {
    let engine = paren_engine();
    let tree = engine.process("(ab)", None, 0).unwrap();

    let root_children = tree.get(tree.root()).unwrap().children();
    assert_eq!(root_children.len(), 1);
    let paren = match &root_children[0] {
        TreeItem::Context(id) => *id,
        other => panic!("expected a context child, got {:?}", other),
    };
    assert_eq!(tree.name(paren).as_named(), Some("paren"));

    let inner = tree.get(paren).unwrap().children();
    assert_eq!(inner.len(), 1);
    assert!(matches!(&inner[0], TreeItem::Match(r) if r.group(0) == Some("ab")));
}

#[test]
fn close_returns_scan_to_root() {
    // Text continues after the group: only a root-level scan can end
    // cleanly, so success demonstrates the pop landed on the root.
    let engine = paren_engine();
    let tree = engine.process("(ab) cd", None, 0).unwrap();
    let records = root_records(&tree);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].group(0), Some("cd"));
}

#[test]
fn deeply_nested_balanced_scan_succeeds() {
    let engine = paren_engine();
    let tree = engine.process("((ab) (cd (ef)))", None, 0).unwrap();

    // root -> paren -> [paren(ab), paren(cd, paren(ef))]
    let root_children = tree.get(tree.root()).unwrap().children();
    assert_eq!(root_children.len(), 1);
    let outer = match &root_children[0] {
        TreeItem::Context(id) => *id,
        other => panic!("expected a context child, got {:?}", other),
    };
    let outer_contexts: Vec<_> = tree
        .get(outer)
        .unwrap()
        .children()
        .iter()
        .filter(|item| matches!(item, TreeItem::Context(_)))
        .collect();
    assert_eq!(outer_contexts.len(), 2);
}

#[test]
fn unbalanced_open_is_unexpected_end_of_input() {
    let engine = paren_engine();
    let err = engine.process("(ab", None, 0).unwrap_err();
    match err {
        Error::UnexpectedEndOfInput { position, previous, .. } => {
            assert_eq!(position.offset, 3);
            assert_eq!(previous.as_deref(), Some("WORD"));
        }
        other => panic!("expected UnexpectedEndOfInput, got {:?}", other),
    }
}

#[test]
fn unbalanced_close_is_unresolved_context() {
    let engine = paren_engine();
    let err = engine.process("ab)", None, 0).unwrap_err();
    match err {
        Error::UnresolvedContext {
            pattern_id,
            context,
            ..
        } => {
            assert_eq!(pattern_id, "CLOSE");
            assert_eq!(context, "paren");
        }
        other => panic!("expected UnresolvedContext, got {:?}", other),
    }
}

#[test]
fn resolver_yielding_nothing_mid_input_is_a_dead_end() {
    let mut engine = Engine::new();
    engine.define_patterns(&[("A", "a")]).unwrap();
    engine.set_ctl_resolver(|_| None);
    engine.set_root_ctl(Control::expect(["A"]));

    let err = engine.process("aa", None, 0).unwrap_err();
    match err {
        Error::DeadEnd { position, previous } => {
            assert_eq!(position.offset, 1);
            assert_eq!(previous.as_deref(), Some("A"));
        }
        other => panic!("expected DeadEnd, got {:?}", other),
    }
}

#[test]
fn resolver_yielding_nothing_at_end_terminates_cleanly() {
    let mut engine = Engine::new();
    engine.define_patterns(&[("A", "(a)")]).unwrap();
    engine.set_ctl_resolver(|_| None);
    engine.set_root_ctl(Control::expect(["A"]));

    let tree = engine.process("a", None, 0).unwrap();
    // Termination by resolver precedes the effects of that step, so the
    // final match never reaches the tree.
    assert!(root_records(&tree).is_empty());
}

#[test]
fn failed_scan_can_be_resumed_at_an_explicit_offset() {
    let engine = alternating_engine();
    let err = engine.process("ab c7 de", None, 0).unwrap_err();
    let offset = match err {
        Error::UnexpectedToken { position, .. } => position.offset,
        other => panic!("expected UnexpectedToken, got {:?}", other),
    };
    assert_eq!(offset, 4);

    // Skip the offending character and scan the rest as a fresh
    // invocation with an explicit control.
    let tree = engine
        .process("ab c7 de", Some(Control::expect(["SPACE"])), offset + 1)
        .unwrap();
    let records = root_records(&tree);
    assert_eq!(records.last().unwrap().group(0), Some("de"));
}

#[test]
fn early_abandonment_leaves_pending_effects_unapplied() {
    let engine = alternating_engine();
    let mut tree = ContextTree::new();
    {
        let mut cursor = engine.iterate_into("ab cd", None, 0, &mut tree);
        let first = cursor.next().unwrap().unwrap();
        assert_eq!(first.text(), "ab");
        // Cursor dropped here, right after the suspension point.
    }
    assert!(root_records(&tree).is_empty());

    engine.process_into("ab cd", None, 0, &mut tree).unwrap();
    assert_eq!(root_records(&tree).len(), 3);
}

#[test]
fn two_scans_merge_under_one_root() {
    let engine = alternating_engine();
    let mut tree = ContextTree::new();
    engine.process_into("ab cd", None, 0, &mut tree).unwrap();
    engine.process_into("ef gh", None, 0, &mut tree).unwrap();

    let groups: Vec<Option<&str>> = root_records(&tree).iter().map(|r| r.group(0)).collect();
    assert_eq!(
        groups,
        vec![
            Some("ab"),
            Some(" "),
            Some("cd"),
            Some("ef"),
            Some(" "),
            Some("gh"),
        ]
    );
}

#[test]
fn repeated_scans_are_deterministic() {
    let engine = paren_engine();
    let text = "(ab (cd)) ef";

    let tokens = |engine: &Engine| -> Vec<String> {
        engine
            .iterate(text, None, 0)
            .map(|step| step.map(|t| format!("{}:{:?}", t.pattern_id(), t.span())))
            .collect::<Result<_, _>>()
            .unwrap()
    };
    assert_eq!(tokens(&engine), tokens(&engine));

    let first = engine.process(text, None, 0).unwrap();
    let second = engine.process(text, None, 0).unwrap();
    assert_eq!(first, second);
}

#[test]
fn empty_input_at_root_is_a_clean_end() {
    let engine = alternating_engine();
    let tree = engine.process("", None, 0).unwrap();
    assert!(tree.get(tree.root()).unwrap().children().is_empty());
}
