//! Planner placement and idempotence tests.

use expect_test::expect;
use xslt_sheet::{
    classify, parse_document, plan, write_document, DialectRules, Element, NodeId, QName,
    SheetDocument, SheetNode, XslKind, XSLT_NAMESPACE,
};

const SHEET_V1: &str = r#"<xsl:stylesheet xmlns:xsl="http://www.w3.org/1999/XSL/Transform" version="1.0">
<xsl:template match="/">
<html>
<xsl:apply-templates select="items/item"/>
</html>
</xsl:template>
<xsl:template match="item">
<xsl:value-of select="@name"/>
</xsl:template>
</xsl:stylesheet>"#;

const SHEET_NAMED: &str = r#"<xsl:stylesheet xmlns:xsl="http://www.w3.org/1999/XSL/Transform" version="3.0">
<xsl:template name="main">
<xsl:param name="limit"/>
<xsl:for-each select="item">
<xsl:sort select="@id"/>
<xsl:value-of select="."/>
</xsl:for-each>
</xsl:template>
</xsl:stylesheet>"#;

fn collect_markers(doc: &SheetDocument, rules: &DialectRules) -> Vec<String> {
    fn walk(doc: &SheetDocument, rules: &DialectRules, id: NodeId, output: &mut Vec<String>) {
        if let Some(element) = doc.node(id).as_element() {
            if let Some(marker) = rules.marker_of(element) {
                output.push(marker);
            }
            for child in doc.children(id).to_vec() {
                walk(doc, rules, child, output);
            }
        }
    }
    let mut output = Vec::new();
    walk(doc, rules, doc.root(), &mut output);
    output
}

#[test]
fn rewritten_documents_reparse_under_the_same_grammar() {
    for (text, rules) in [
        (SHEET_V1, DialectRules::v1()),
        (SHEET_NAMED, DialectRules::v3()),
    ] {
        let mut doc = parse_document(text).unwrap();
        plan(&mut doc, &rules).unwrap();
        let written = write_document(&doc);
        let reparsed = parse_document(&written);
        assert!(reparsed.is_ok(), "rewrite broke the document:\n{written}");
    }
}

#[test]
fn planning_twice_inserts_nothing_new() {
    let mut doc = parse_document(SHEET_NAMED).unwrap();
    let rules = DialectRules::v3();
    let first = plan(&mut doc, &rules).unwrap();
    assert!(first.inserted > 0);
    let markers_before = collect_markers(&doc, &rules);

    let second = plan(&mut doc, &rules).unwrap();
    assert_eq!(second.inserted, 0);
    assert_eq!(collect_markers(&doc, &rules), markers_before);
    assert_eq!(second.instrumented_lines, first.instrumented_lines);
}

#[test]
fn named_scope_probe_order() {
    let mut doc = parse_document(SHEET_NAMED).unwrap();
    let rules = DialectRules::v3();
    plan(&mut doc, &rules).unwrap();

    let markers = collect_markers(&doc, &rules).join("\n") + "\n";
    expect![[r#"
        trace:limit
        enter:2
        break:4
        position:4
        break:6
        leave:2
    "#]]
    .assert_eq(&markers);
}

#[test]
fn branch_arms_receive_leading_probes_only() {
    let text = r#"<xsl:stylesheet xmlns:xsl="http://www.w3.org/1999/XSL/Transform" version="1.0">
<xsl:template match="/">
<xsl:choose>
<xsl:when test="a"><xsl:value-of select="a"/></xsl:when>
<xsl:otherwise><xsl:value-of select="b"/></xsl:otherwise>
</xsl:choose>
</xsl:template>
</xsl:stylesheet>"#;
    let mut doc = parse_document(text).unwrap();
    let rules = DialectRules::v1();
    plan(&mut doc, &rules).unwrap();

    let template = doc.child_elements(doc.root()).next().unwrap();
    let choose = doc
        .child_elements(template)
        .find(|id| classify(doc.element(*id)) == XslKind::Choose)
        .unwrap();

    // Children of the branch container are exactly the arms.
    for arm in doc.child_elements(choose) {
        let kind = classify(doc.element(arm));
        assert!(matches!(kind, XslKind::When | XslKind::Otherwise));
        let first = doc.child_elements(arm).next().unwrap();
        assert!(rules.is_probe(doc.element(first)), "arm without leading probe");
    }
}

#[test]
fn repetition_keeps_sort_first_then_break_then_position() {
    let mut doc = parse_document(SHEET_NAMED).unwrap();
    let rules = DialectRules::v3();
    plan(&mut doc, &rules).unwrap();

    let template = doc.child_elements(doc.root()).next().unwrap();
    let for_each = doc
        .child_elements(template)
        .find(|id| classify(doc.element(*id)) == XslKind::ForEach)
        .unwrap();
    let kinds: Vec<Option<String>> = doc
        .child_elements(for_each)
        .map(|id| rules.marker_of(doc.element(id)))
        .collect();

    assert_eq!(classify(doc.element(doc.child_elements(for_each).next().unwrap())), XslKind::Sort);
    assert_eq!(kinds[0], None, "sort stays first");
    assert_eq!(kinds[1].as_deref(), Some("break:4"));
    assert_eq!(kinds[2].as_deref(), Some("position:4"));
}

#[test]
fn scope_exit_is_last_and_not_duplicated() {
    let mut doc = parse_document(SHEET_NAMED).unwrap();
    let rules = DialectRules::v3();
    plan(&mut doc, &rules).unwrap();
    plan(&mut doc, &rules).unwrap();

    let template = doc.child_elements(doc.root()).next().unwrap();
    let exits: Vec<_> = doc
        .child_elements(template)
        .filter(|id| {
            rules
                .marker_of(doc.element(*id))
                .is_some_and(|marker| marker.starts_with("leave:"))
        })
        .collect();
    assert_eq!(exits.len(), 1);
    let last = doc
        .child_elements(template)
        .last()
        .unwrap();
    assert_eq!(rules.marker_of(doc.element(last)).as_deref(), Some("leave:2"));
}

#[test]
fn output_only_contexts_are_not_instrumented() {
    let text = r#"<xsl:stylesheet xmlns:xsl="http://www.w3.org/1999/XSL/Transform" version="1.0">
<xsl:template match="/">
<xsl:attribute name="id">
<xsl:value-of select="@id"/>
</xsl:attribute>
</xsl:template>
</xsl:stylesheet>"#;
    let mut doc = parse_document(text).unwrap();
    let rules = DialectRules::v1();
    plan(&mut doc, &rules).unwrap();

    let template = doc.child_elements(doc.root()).next().unwrap();
    let attribute = doc
        .child_elements(template)
        .find(|id| classify(doc.element(*id)) == XslKind::AttributeCtor)
        .unwrap();
    let probed = doc
        .child_elements(attribute)
        .any(|id| rules.is_probe(doc.element(id)));
    assert!(!probed, "attribute content must stay pristine");
}

#[test]
fn v3_leaves_try_subtrees_untouched() {
    let text = r#"<xsl:stylesheet xmlns:xsl="http://www.w3.org/1999/XSL/Transform" version="3.0">
<xsl:template match="/">
<xsl:try>
<xsl:value-of select="1 div 0"/>
<xsl:catch><xsl:value-of select="'caught'"/></xsl:catch>
</xsl:try>
</xsl:template>
</xsl:stylesheet>"#;
    let mut doc = parse_document(text).unwrap();
    let rules = DialectRules::v3();
    plan(&mut doc, &rules).unwrap();

    let template = doc.child_elements(doc.root()).next().unwrap();
    let try_block = doc
        .child_elements(template)
        .find(|id| classify(doc.element(*id)) == XslKind::Try)
        .unwrap();

    fn any_probe(doc: &SheetDocument, rules: &DialectRules, id: NodeId) -> bool {
        doc.child_elements(id).any(|child| {
            rules.is_probe(doc.element(child)) || any_probe(doc, rules, child)
        })
    }
    assert!(!any_probe(&doc, &rules, try_block));
}

#[test]
fn nodes_without_lines_are_skipped_silently() {
    let root = Element {
        name: QName::new(Some("xsl"), "stylesheet"),
        namespace: Some(XSLT_NAMESPACE.into()),
        attributes: Vec::new(),
        children: Vec::new(),
        line: None,
    };
    let mut doc = SheetDocument::new(root);
    let template = doc.push_node(SheetNode::Element(Element {
        name: QName::new(Some("xsl"), "template"),
        namespace: Some(XSLT_NAMESPACE.into()),
        attributes: vec![],
        children: Vec::new(),
        line: None,
    }));
    doc.append_child(doc.root(), template);
    let value_of = doc.push_node(SheetNode::Element(Element {
        name: QName::new(Some("xsl"), "value-of"),
        namespace: Some(XSLT_NAMESPACE.into()),
        attributes: vec![],
        children: Vec::new(),
        line: None,
    }));
    doc.append_child(template, value_of);

    let report = plan(&mut doc, &DialectRules::v1()).unwrap();
    assert_eq!(report.inserted, 0);
}

#[test]
fn non_stylesheet_root_is_rejected() {
    let mut doc = parse_document("<html><body/></html>").unwrap();
    assert!(plan(&mut doc, &DialectRules::v1()).is_err());
}

#[test]
fn v1_rewrite_snapshot() {
    let text = "<xsl:stylesheet xmlns:xsl=\"http://www.w3.org/1999/XSL/Transform\" version=\"1.0\"><xsl:template match=\"/\"><xsl:apply-templates/></xsl:template></xsl:stylesheet>";
    let mut doc = parse_document(text).unwrap();
    plan(&mut doc, &DialectRules::v1()).unwrap();
    let written = write_document(&doc);
    expect![[r#"
        <?xml version="1.0" encoding="UTF-8"?>
        <xsl:stylesheet xmlns:xsl="http://www.w3.org/1999/XSL/Transform" version="1.0" xmlns:dbg="urn:xslt-debug:probe"><xsl:template match="/"><xsl:value-of select="dbg:break(1, .)"/><xsl:apply-templates/></xsl:template></xsl:stylesheet>"#]]
    .assert_eq(&written);
}
