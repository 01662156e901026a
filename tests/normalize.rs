//! End-to-end normalization scenarios: whole rulebases compiled, optimized,
//! and matched against real lines.

use logdag::{
    Annotator, Context, ORIGINALMSG_FIELD, Outcome, Record, TAGS_FIELD, UNPARSED_FIELD,
};
use serde_json::{Value, json};

fn context_of(rules: &[Value]) -> Context {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut ctx = Context::new();
    for rule in rules {
        ctx.builder().add_rule(rule, &[]).unwrap();
    }
    ctx.optimize();
    ctx
}

fn record(value: Value) -> Record {
    value.as_object().unwrap().clone()
}

#[test]
fn literal_prefix_and_word_capture() {
    let ctx = context_of(&[json!([
        {"type": "literal", "text": "user="},
        {"type": "word", "name": "user"},
    ])]);
    let out = ctx.normalize("user=alice");
    assert!(out.is_structured());
    assert_eq!(out.record, record(json!({"user": "alice"})));
}

#[test]
fn shared_prefix_resolves_by_intrinsic_priority() {
    // Both rules match "err 42"; number outranks rest.
    let ctx = context_of(&[
        json!([{"type": "literal", "text": "err "}, {"type": "rest", "name": "msg"}]),
        json!([{"type": "literal", "text": "err "}, {"type": "number", "name": "code"}]),
    ]);
    let out = ctx.normalize("err 42");
    assert_eq!(out.record, record(json!({"code": 42})));
    // Inputs only rest can take still normalize.
    let out = ctx.normalize("err out of cheese");
    assert_eq!(out.record, record(json!({"msg": "out of cheese"})));
}

#[test]
fn alternative_branches_converge() {
    let ctx = context_of(&[json!([
        {"type": "alternative", "parser": [
            {"type": "literal", "text": "ok"},
            {"type": "literal", "text": "OK"},
        ]},
        {"type": "literal", "text": " done"},
    ])]);
    for input in ["ok done", "OK done"] {
        let out = ctx.normalize(input);
        assert!(out.is_structured(), "{input}");
        assert!(out.record.is_empty(), "{input}");
    }
    assert_eq!(ctx.normalize("ko done").outcome, Outcome::Unparsed);
}

#[test]
fn component_splice_merges_fields() {
    let mut ctx = Context::new();
    ctx.builder()
        .define_component(
            "addr",
            &json!([
                {"type": "ipv4", "name": "ip"},
                {"type": "literal", "text": ":"},
                {"type": "number", "name": "port"},
            ]),
        )
        .unwrap();
    ctx.builder()
        .add_rule(&json!({"type": "@addr", "name": "."}), &[])
        .unwrap();
    ctx.optimize();

    let out = ctx.normalize("10.0.0.1:80");
    assert!(out.is_structured());
    assert_eq!(out.record, record(json!({"ip": "10.0.0.1", "port": 80})));
}

#[test]
fn component_under_a_field_name_nests() {
    let mut ctx = Context::new();
    ctx.builder()
        .define_component("addr", &json!({"type": "ipv4", "name": "ip"}))
        .unwrap();
    ctx.builder()
        .add_rule(&json!({"type": "@addr", "name": "peer"}), &[])
        .unwrap();
    ctx.optimize();
    assert_eq!(
        ctx.normalize("10.0.0.1").record,
        record(json!({"peer": {"ip": "10.0.0.1"}}))
    );
}

#[test]
fn failure_reports_original_and_unparsed_tail() {
    let ctx = context_of(&[json!([
        {"type": "literal", "text": "foo"},
        {"type": "literal", "text": "bar"},
    ])]);
    let out = ctx.normalize("foobaz");
    assert_eq!(out.outcome, Outcome::Unparsed);
    assert_eq!(out.record[ORIGINALMSG_FIELD], "foobaz");
    assert_eq!(out.record[UNPARSED_FIELD], "baz");
    assert!(!out.record.contains_key(TAGS_FIELD));
}

struct TagJoiner;

impl Annotator for TagJoiner {
    fn annotate(&self, record: &mut Record, tags: &[String]) {
        record.insert("annotation".to_string(), Value::from(tags.join("+")));
    }
}

#[test]
fn tags_attach_and_the_annotator_sees_them() {
    let mut ctx = Context::new();
    ctx.builder()
        .add_rule(
            &json!([{"type": "literal", "text": "login "}, {"type": "word", "name": "user"}]),
            &["login".to_string(), "audit".to_string()],
        )
        .unwrap();
    ctx.set_annotator(Box::new(TagJoiner));
    ctx.optimize();

    let out = ctx.normalize("login alice");
    assert!(out.is_structured());
    assert_eq!(out.record[TAGS_FIELD], json!(["login", "audit"]));
    assert_eq!(out.record["annotation"], "login+audit");

    // Failures carry no tags and never reach the annotator.
    let miss = ctx.normalize("not a login");
    assert!(!miss.record.contains_key(TAGS_FIELD));
    assert!(!miss.record.contains_key("annotation"));
}

#[test]
fn two_rules_terminating_together_union_their_tags() {
    let mut ctx = Context::new();
    ctx.builder()
        .add_rule(&json!({"type": "rest"}), &["a".to_string()])
        .unwrap();
    ctx.builder()
        .add_rule(&json!({"type": "rest"}), &["b".to_string(), "a".to_string()])
        .unwrap();
    ctx.optimize();
    assert_eq!(ctx.normalize("x").record[TAGS_FIELD], json!(["a", "b"]));
}

#[test]
fn user_priority_beats_intrinsic_order() {
    // Two words differing only in capture name and priority; the smaller
    // priority number wins.
    let ctx = context_of(&[
        json!({"type": "word", "name": "second", "priority": 20}),
        json!({"type": "word", "name": "first", "priority": 10}),
    ]);
    assert_eq!(ctx.normalize("hello").record, record(json!({"first": "hello"})));

    // A prioritized rest outranks an unprioritized number.
    let ctx = context_of(&[
        json!({"type": "number", "name": "n"}),
        json!({"type": "rest", "name": "r", "priority": 0}),
    ]);
    assert_eq!(ctx.normalize("42").record, record(json!({"r": "42"})));
}

#[test]
fn backtracking_explores_lower_priority_paths() {
    // word consumes "hello", but its continuation demands " end"; when that
    // fails, matching backtracks and hands the whole line to rest.
    let ctx = context_of(&[
        json!([{"type": "word", "name": "w"}, {"type": "literal", "text": " end"}]),
        json!({"type": "rest", "name": "r"}),
    ]);
    assert_eq!(
        ctx.normalize("hello world").record,
        record(json!({"r": "hello world"}))
    );
    assert_eq!(ctx.normalize("hello end").record, record(json!({"w": "hello"})));
}

#[test]
fn syslog_shaped_rule_end_to_end() {
    let ctx = context_of(&[json!([
        {"type": "date-rfc3164", "name": "timestamp"},
        {"type": "literal", "text": " "},
        {"type": "char-to", "char": " ", "name": "host"},
        {"type": "literal", "text": " sshd["},
        {"type": "number", "name": "pid"},
        {"type": "literal", "text": "]: Accepted password for "},
        {"type": "word", "name": "user"},
        {"type": "literal", "text": " from "},
        {"type": "ipv4", "name": "client"},
        {"type": "rest"},
    ])]);
    let out = ctx.normalize("Feb  3 07:01:22 gw01 sshd[4242]: Accepted password for root from 192.168.0.9 port 2022");
    assert!(out.is_structured());
    assert_eq!(
        out.record,
        record(json!({
            "timestamp": "Feb  3 07:01:22",
            "host": "gw01",
            "pid": 4242,
            "user": "root",
            "client": "192.168.0.9",
        }))
    );
}

#[test]
fn repeat_collects_a_list() {
    let ctx = context_of(&[json!([
        {"type": "literal", "text": "ports "},
        {
            "type": "repeat",
            "name": "ports",
            "parser": {"type": "number", "name": "port"},
            "while": {"type": "literal", "text": ", "},
        },
    ])]);
    let out = ctx.normalize("ports 80, 443, 8080");
    assert!(out.is_structured());
    assert_eq!(
        out.record,
        record(json!({"ports": [{"port": 80}, {"port": 443}, {"port": 8080}]}))
    );
}

#[test]
fn optimization_does_not_change_outcomes() {
    let rules = [
        json!([
            {"type": "literal", "text": "a"},
            {"type": "literal", "text": "b"},
            {"type": "literal", "text": "c"},
            {"type": "number", "name": "n"},
        ]),
        json!([{"type": "literal", "text": "a"}, {"type": "rest", "name": "r"}]),
    ];
    let mut plain = Context::new();
    for rule in &rules {
        plain.builder().add_rule(rule, &[]).unwrap();
    }
    let optimized = context_of(&rules);
    for input in ["abc7", "abcx", "a", "abc", "zzz", ""] {
        let before = plain.normalize(input);
        let after = optimized.normalize(input);
        assert_eq!(before.outcome, after.outcome, "{input}");
        assert_eq!(before.record, after.record, "{input}");
    }
}

#[test]
fn a_frozen_context_is_shared_across_threads() {
    let ctx = std::sync::Arc::new(context_of(&[json!([
        {"type": "literal", "text": "n="},
        {"type": "number", "name": "n"},
    ])]));
    let handles: Vec<_> = (0..4)
        .map(|t| {
            let ctx = ctx.clone();
            std::thread::spawn(move || {
                for i in 0..100 {
                    let out = ctx.normalize(&format!("n={}", t * 1000 + i));
                    assert!(out.is_structured());
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
}
