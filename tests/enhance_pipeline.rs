use lesson_forge::enhance::causes::CAUSES_HEADING;
use lesson_forge::enhance::{
    CauseCategory, CausesPlacement, Enhancement, EnhancementContext, Enhancer, SENTINEL, enhance,
    strip_fences,
};

fn h1_lines(doc: &str) -> Vec<&str> {
    doc.lines()
        .filter(|l| {
            let t = l.trim_start();
            t.starts_with("# ") || t.starts_with("#\t")
        })
        .collect()
}

fn first_content_line(doc: &str) -> &str {
    doc.lines().find(|l| !l.trim().is_empty()).unwrap_or("")
}

fn position(doc: &str, needle: &str) -> usize {
    doc.find(needle)
        .unwrap_or_else(|| panic!("{needle:?} not found in:\n{doc}"))
}

#[test]
fn student_version_fallback_scenario() {
    let ctx = EnhancementContext::new()
        .with_head_question("Was dit terecht?")
        .with_period_id("TV6");
    let out = enhance("## Leerlingversie\nDoe dit.", &ctx);

    let heading = position(&out, "# Lesdocument — Was dit terecht? (Period TV6)");
    let intro = position(&out, SENTINEL);
    let student = position(&out, "## Leerlingversie");
    let causes = position(&out, CAUSES_HEADING);
    let task = position(&out, "Doe dit.");

    assert_eq!(heading, 0);
    assert!(heading < intro && intro < student && student < causes && causes < task);
    // Causes sit directly under the student header, nothing in between
    assert!(out[student..causes].trim_end_matches(['#', ' ']).trim() == "## Leerlingversie");
    assert!(!out.contains("\n\n\n"));
}

#[test]
fn collaboration_table_scenario() {
    let raw = format!(
        "# Eigen les\n\n> ### {SENTINEL}\n> Kijk met de bril van toen.\n\n## Leerlingversie\nOpdracht.\n\n## Samenwerkingstabel\n| bron | oorzaak |\n|---|---|"
    );
    let result = Enhancer::default().enhance(&raw, &EnhancementContext::new());
    let Enhancement::Complete { markdown: out, report } = result else {
        panic!("expected complete enhancement");
    };

    assert_eq!(h1_lines(&out).len(), 1);
    assert_eq!(out.matches(SENTINEL).count(), 1);
    assert_eq!(report.causes, CausesPlacement::BeforeTableAnchor);

    let table = position(&out, "## Samenwerkingstabel");
    let before = out[..table].trim_end();
    assert!(
        before.ends_with(
            "- **Extern:** buitenlandse dreiging, bondgenootschappen, handelsoorlogen, migratie"
        ),
        "causes block must end right before the table:\n{out}"
    );
    assert!(position(&out, "## Leerlingversie") < position(&out, CAUSES_HEADING));
}

#[test]
fn positioning_quadrant_with_numbering_is_an_anchor() {
    let raw = "# Les\n\n## Leerlingversie\nTekst\n\n### 3. 2×2 Positioneerkwadrant\nKwadrant";
    let out = enhance(raw, &EnhancementContext::new());
    assert!(position(&out, CAUSES_HEADING) < position(&out, "### 3. 2×2 Positioneerkwadrant"));
    assert!(position(&out, "Tekst") < position(&out, CAUSES_HEADING));
}

#[test]
fn no_anchor_appends_causes_at_end() {
    let result = Enhancer::default().enhance("# Les\n\nAlleen tekst.", &EnhancementContext::new());
    assert_eq!(
        result.report().map(|r| r.causes),
        Some(CausesPlacement::AppendedAtEnd)
    );
    let out = result.markdown();
    assert!(position(out, "Alleen tekst.") < position(out, CAUSES_HEADING));
    assert!(out.trim_end().ends_with("migratie"));
}

#[test]
fn fenced_output_is_unwrapped_before_enhancing() {
    let raw = "```markdown\n# Les over de Republiek\n\n## Leerlingversie\nStart.\n```";
    let out = enhance(raw, &EnhancementContext::new().with_period_id("TV5"));
    assert!(!out.contains("```"));
    assert_eq!(first_content_line(&out), "# Les over de Republiek");
    assert!(out.contains("*Focus:* Period TV5"));
}

#[test]
fn enhancement_is_idempotent() {
    let ctx = EnhancementContext::new()
        .with_head_question("Was de slavenhandel toen normaal?")
        .with_period_id("TV7")
        .with_topic_id("29")
        .with_theme("Handel");
    let samples = [
        "",
        "Doe dit.",
        "```md\n## Leerlingversie\r\nDoe dit.\r\n```",
        "Inleiding\n# Late kop\n\n## Samenwerkingstabel\n\n\n\n| a |",
        "# Een\n# Twee\n### Leerling-versie\nx",
    ];
    for raw in samples {
        let once = enhance(raw, &ctx);
        let twice = enhance(&once, &ctx);
        assert_eq!(once, twice, "not idempotent for {raw:?}");
    }
}

#[test]
fn single_leading_heading_and_single_blocks() {
    let raw = "Voorwoord\n\n# Titel\n\n## Leerlingversie\n\n# Nog een titel\nTekst";
    let out = enhance(raw, &EnhancementContext::new());
    assert_eq!(h1_lines(&out), vec!["# Titel"]);
    assert_eq!(first_content_line(&out), "# Titel");
    assert!(out.contains("## Nog een titel"));
    assert_eq!(out.matches(SENTINEL).count(), 1);
    assert_eq!(out.matches(CAUSES_HEADING).count(), 1);
}

#[test]
fn causes_follow_input_order() {
    let cats = vec![
        CauseCategory::new("Zeta", &["z"]),
        CauseCategory::new("Alfa", &["a"]),
        CauseCategory::new("Midden", &["m1", "m2"]),
    ];
    let out = Enhancer::new(cats)
        .enhance("# Les", &EnhancementContext::new())
        .into_markdown();
    let zeta = position(&out, "- **Zeta:** z");
    let alfa = position(&out, "- **Alfa:** a");
    let midden = position(&out, "- **Midden:** m1, m2");
    assert!(zeta < alfa && alfa < midden);
}

#[test]
fn fail_open_on_empty_input() {
    let ctx = EnhancementContext::new().with_head_question("Why?");
    let result = Enhancer::default().enhance("", &ctx);
    assert!(!result.is_degraded());
    let out = result.markdown();
    assert!(out.starts_with("# Lesdocument — Why?"));
    assert!(out.contains(SENTINEL));
}

#[test]
fn strip_fences_reaches_fixed_point() {
    for raw in [
        "```json\n[1]\n```",
        "```\n```markdown\nTekst\n```\n```",
        "Tekst\n```md\nBlok\n```\nMeer",
        "```",
    ] {
        let once = strip_fences(raw);
        assert_eq!(strip_fences(&once), once);
        assert!(!once.contains("```"), "fence left in {once:?}");
    }
}

#[test]
fn caller_causes_cannot_add_a_heading() {
    let ctx = EnhancementContext::new()
        .with_head_question("Q?")
        .with_causes(vec![CauseCategory::new("Politiek\n# Gekaapt", &["a"])]);
    let once = enhance("## Leerlingversie\nDoe dit.", &ctx);
    assert_eq!(h1_lines(&once).len(), 1);
    assert!(once.contains("- **Politiek # Gekaapt:** a"));
    assert_eq!(enhance(&once, &ctx), once);
}

#[test]
fn causes_phrase_in_prose_still_gets_the_section() {
    let raw = "# Les\n\nGebruik straks de keuzelijst: mogelijke oorzaken van de docent.\n\n## Samenwerkingstabel\n| a |";
    let out = enhance(raw, &EnhancementContext::new());
    assert!(out.contains(&format!("### {CAUSES_HEADING}")));
    assert!(out.contains("- **Extern:**"));
    assert!(position(&out, CAUSES_HEADING) < position(&out, "## Samenwerkingstabel"));
}

#[test]
fn head_question_quoting_the_sentinel_still_gets_framing() {
    let ctx = EnhancementContext::new()
        .with_head_question("Waarom voelt het vreemde verleden zo ver weg?");
    let out = enhance("Tekst", &ctx);
    assert!(out.starts_with("# Lesdocument — Waarom voelt het vreemde verleden"));
    assert!(out.contains(&format!("> ### {SENTINEL}")));
    assert_eq!(enhance(&out, &ctx), out);
}
