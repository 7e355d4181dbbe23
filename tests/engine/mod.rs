// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use anyhow::Result;
use jinja_vars::*;
use serde_json::json;

const PAGE: &str = r#"{% extends "layout.html" %}
{% block body %}
<h1>{{ page.title | title }}</h1>
{% for post in posts | sort(attribute="date", reverse=true) %}
  <article>
    <h2>{{ post.title }}</h2>
    {% if post.tags %}{{ post.tags | join(", ") }}{% endif %}
    <span>{{ post.views }} views</span>
  </article>
{% else %}
  <p>{{ empty_text | default("Nothing yet") }}</p>
{% endfor %}
{% endblock %}
"#;

#[test]
fn extract_is_repeatable() {
    let engine = Engine::new();
    let first = engine.extract(PAGE);
    for _ in 0..3 {
        assert_eq!(engine.extract(PAGE), first);
    }
    assert_eq!(
        first.names().collect::<Vec<_>>(),
        vec!["page", "posts", "empty_text"]
    );
}

#[test]
fn page_sample() -> Result<()> {
    let schema = extract(PAGE);
    assert_eq!(
        serde_json::to_value(&schema)?,
        json!({
            "page": {"title": ""},
            "posts": [{"title": "", "tags": [""], "views": ""}],
            "empty_text": ""
        })
    );
    Ok(())
}

#[test]
fn extract_lines_selects_a_range() -> Result<()> {
    let source = Source::new("page.html".to_string(), PAGE.to_string());
    let engine = Engine::new();

    let schema = engine.extract_lines(&source, 3, 3)?;
    assert_eq!(schema.names().collect::<Vec<_>>(), vec!["page"]);

    // The loop header is outside the range, so `post` is free here.
    let schema = engine.extract_lines(&source, 6, 6)?;
    assert_eq!(schema.names().collect::<Vec<_>>(), vec!["post"]);

    assert!(engine.extract_lines(&source, 0, 2).is_err());
    assert!(engine.extract_lines(&source, 5, 4).is_err());
    let err = engine.extract_lines(&source, 2, 500).unwrap_err();
    assert!(err.to_string().contains("page.html"));
    Ok(())
}

#[test]
fn helpers_for_completion() {
    let schema = extract(PAGE);
    assert_eq!(schema.resolve("posts").map(|n| n.type_name()), Some("array"));
    assert_eq!(schema.resolve("posts.0.tags").map(|n| n.type_name()), Some("array"));
    assert_eq!(
        schema.resolve("posts[0].title").map(|n| n.type_name()),
        Some("unknown")
    );
    assert_eq!(
        schema.sibling_keys("posts.0.ti"),
        vec!["title", "tags", "views"]
    );
    assert_eq!(
        schema.sibling_keys("pa"),
        vec!["page", "posts", "empty_text"]
    );
    assert!(schema.resolve("posts.title").is_none());
}

#[test]
fn fill_sample_merges_with_user_data() {
    let schema = extract(PAGE);
    let existing = json!({
        "page": {"title": "Blog", "subtitle": "kept"},
        "posts": [{"title": "First"}, {"title": "Second", "views": 10}]
    });
    assert_eq!(
        schema.fill_sample(&existing),
        json!({
            "page": {"title": "Blog", "subtitle": "kept"},
            "posts": [
                {"title": "First", "tags": [""], "views": ""},
                {"title": "Second", "views": 10, "tags": [""]}
            ],
            "empty_text": ""
        })
    );
}

#[test]
fn describe_reports_structure() -> Result<()> {
    let schema = extract("{% for r in rows %}{{ r.n > 1 }}{% endfor %}{% if ok %}{% endif %}");
    assert_eq!(
        serde_json::to_value(schema.describe())?,
        json!({
            "rows": {
                "kind": "array",
                "element": {
                    "kind": "object",
                    "fields": {"n": {"kind": "scalar", "type": "number"}}
                }
            },
            "ok": {"kind": "scalar", "type": "boolean"}
        })
    );
    Ok(())
}

#[test]
fn options_change_extraction() -> Result<()> {
    let template = "{% raw %}{{ hidden }}{% endraw %}{{ site.url }}{{ age }}";

    assert_eq!(
        serde_json::to_value(extract(template))?,
        json!({"site": {"url": ""}, "age": 0})
    );

    let options = EngineOptions::from_json(
        r#"{"raw_blocks": "inspect", "globals": ["site"], "name_hints": false}"#,
    )?;
    let mut engine = Engine::new();
    engine.set_options(options);
    assert_eq!(engine.options().raw_blocks, RawBlocks::Inspect);
    assert_eq!(
        serde_json::to_value(engine.extract(template))?,
        json!({"hidden": "", "age": ""})
    );
    Ok(())
}

#[cfg(feature = "yaml")]
#[test]
fn options_from_yaml() -> Result<()> {
    let options = EngineOptions::from_yaml("max_scope_depth: 4\nglobals: [request]\n")?;
    assert_eq!(options.max_scope_depth, 4);
    assert!(options.is_global("request"));
    Ok(())
}

#[test]
fn malformed_templates_never_fail() {
    for template in [
        "{{",
        "{%",
        "{#",
        "{{ }}",
        "{% %}",
        "{% for %}",
        "{% for in %}{% endfor %}",
        "{% set = %}",
        "{% macro (%}",
        "{{ a.[b] }}",
        "{{ a[ }}",
        "{{ ((( }}",
        "{{ ))) ]] }}",
        "{% endfor %}{% endif %}{% endmacro %}",
        "{{ 'unterminated }}",
        "{% if a %}{% for x in y %}",
        "{{ a | }}",
        "{{ a is }}",
        "{{ x if }}",
        "{{ x if y else }}",
    ] {
        let _ = extract(template).to_sample();
    }
}

#[test]
fn statements_are_inspectable() {
    let source = Source::new(
        "t".to_string(),
        "{% for a, b in pairs %}{% set x = 1 %}{% wat %}{% endfor %}".to_string(),
    );
    let tags: Vec<_> = Engine::new()
        .statements(&source)
        .into_iter()
        .map(|s| s.tag)
        .collect();
    assert_eq!(
        tags,
        vec![
            unstable::Tag::For {
                targets: vec!["a".to_string(), "b".to_string()],
                recursive: false
            },
            unstable::Tag::Set {
                targets: vec!["x".to_string()]
            },
            unstable::Tag::Unknown("wat".to_string()),
            unstable::Tag::End(unstable::BlockKind::For),
        ]
    );
}
