// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::hint::black_box;

use jinja_vars::Engine;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

const ROW: &str = r#"
<tr class="{{ 'odd' if loop.index is odd else 'even' }}">
  {% for cell in row.cells | selectattr("visible") %}
    <td>{{ cell.label | default("-") | e }} {{ cell.value | round(2) }}</td>
  {% endfor %}
  {% if row.total > limit and not row.hidden %}<td>{{ row.total ~ currency }}</td>{% endif %}
</tr>
"#;

fn template(rows: usize) -> String {
    let mut text = String::from("{% extends 'base.html' %}{% block body %}<table>");
    for i in 0..rows {
        text.push_str(&format!("{{% for row in table_{i}.rows %}}"));
        text.push_str(ROW);
        text.push_str("{% endfor %}");
    }
    text.push_str("</table>{% endblock %}");
    text
}

fn extract_small(c: &mut Criterion) {
    let engine = Engine::new();
    c.bench_function("extract simple interpolations", |b| {
        b.iter(|| {
            let schema = engine.extract(black_box(
                "Hello {{ name }}! You are {{ age }} years old and \
                 {% if active %}active{% endif %}.",
            ));
            assert_eq!(schema.len(), 3);
        })
    });
}

fn extract_scaling(c: &mut Criterion) {
    let engine = Engine::new();
    let mut group = c.benchmark_group("extract nested loops");
    for rows in [1usize, 10, 100] {
        let text = template(rows);
        group.bench_with_input(BenchmarkId::from_parameter(rows), &text, |b, text| {
            b.iter(|| {
                let schema = engine.extract(black_box(text));
                assert_eq!(schema.len(), rows + 2);
            })
        });
    }
    group.finish();
}

criterion_group!(extract_benches, extract_small, extract_scaling);
criterion_main!(extract_benches);
