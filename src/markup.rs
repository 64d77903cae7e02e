use html5ever::serialize::{serialize, SerializeOpts, TraversalScope};
use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::{local_name, namespace_url, ns, parse_fragment, QualName};
use markup5ever_rcdom::{Handle, NodeData, RcDom, SerializableHandle};
use std::io;
use std::mem;

/// Parses an HTML fragment the way a browser would parse the inner HTML of a `<body>`.
///
/// Malformed markup never fails; the tree builder recovers the same way html5ever
/// always does. The returned handle is the synthetic root element that holds the
/// parsed nodes, so `inner_html` on it gives back the normalized fragment.
///
/// Dropping an rcdom node empties its whole subtree, so handles found below the root
/// are only usable while the root handle is alive.
pub fn parse_html_fragment(html: &str) -> Handle {
    let dom = parse_fragment(
        RcDom::default(),
        Default::default(),
        QualName::new(None, ns!(html), local_name!("body")),
        vec![],
    )
    .one(html);

    // Detach the root so dropping the document does not empty it
    let fragment_root = mem::take(&mut *dom.document.children.borrow_mut())
        .into_iter()
        .next();

    fragment_root.unwrap_or_else(|| dom.document.clone())
}

pub fn element_name(node: &Handle) -> Option<&str> {
    match node.data {
        NodeData::Element { ref name, .. } => Some(&*name.local),
        _ => None,
    }
}

pub fn attribute(node: &Handle, attribute_name: &str) -> Option<String> {
    match node.data {
        NodeData::Element { ref attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|attr| &*attr.name.local == attribute_name)
            .map(|attr| attr.value.to_string()),
        _ => None,
    }
}

/// All descendant elements named `tag_name`, in document order. The node itself is not
/// included.
pub fn find_elements(node: &Handle, tag_name: &str) -> Vec<Handle> {
    find_elements_named(node, &[tag_name])
}

pub fn find_elements_named(node: &Handle, tag_names: &[&str]) -> Vec<Handle> {
    let mut found = vec![];
    collect_elements(node, tag_names, &mut found);

    found
}

fn collect_elements(node: &Handle, tag_names: &[&str], found: &mut Vec<Handle>) {
    for child in node.children.borrow().iter() {
        if let Some(name) = element_name(child) {
            if tag_names.contains(&name) {
                found.push(child.clone());
            }
        }
        collect_elements(child, tag_names, found);
    }
}

pub fn text_content(node: &Handle) -> String {
    let mut content = String::new();
    visit_text_nodes(node, &mut |text: &str| content.push_str(text));

    content
}

fn visit_text_nodes(node: &Handle, visit: &mut impl FnMut(&str)) {
    if let NodeData::Text { ref contents } = node.data {
        let contents = contents.borrow();
        visit(&**contents);
    }
    for child in node.children.borrow().iter() {
        visit_text_nodes(child, visit);
    }
}

/// Rewrites every text node under `node` (including `node` itself) in place.
/// `rewrite` returns `None` to leave a text node untouched.
pub fn rewrite_text_nodes(node: &Handle, rewrite: &impl Fn(&str) -> Option<String>) {
    if let NodeData::Text { ref contents } = node.data {
        let replacement = {
            let current = contents.borrow();
            rewrite(&**current)
        };
        if let Some(replacement) = replacement {
            *contents.borrow_mut() = StrTendril::from_slice(&replacement);
        }
    }
    for child in node.children.borrow().iter() {
        rewrite_text_nodes(child, rewrite);
    }
}

pub fn inner_html(node: &Handle) -> Result<String, io::Error> {
    serialize_handle(node, TraversalScope::ChildrenOnly(None))
}

/// Serializes an element together with its own tag. Document nodes cannot be
/// serialized this way; use `inner_html` for those.
#[cfg(test)]
pub fn outer_html(node: &Handle) -> Result<String, io::Error> {
    serialize_handle(node, TraversalScope::IncludeNode)
}

fn serialize_handle(node: &Handle, traversal_scope: TraversalScope) -> Result<String, io::Error> {
    let mut output = vec![];
    let serializable: SerializableHandle = node.clone().into();
    serialize(
        &mut output,
        &serializable,
        SerializeOpts {
            traversal_scope,
            ..Default::default()
        },
    )?;

    Ok(String::from_utf8_lossy(&output).into_owned())
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_fragment_round_trips_simple_markup() {
        let fragment = parse_html_fragment("<p>Hello <strong>there</strong></p>");

        assert_eq!(
            inner_html(&fragment).unwrap(),
            "<p>Hello <strong>there</strong></p>"
        );
    }

    #[test]
    fn test_parse_fragment_recovers_from_unclosed_tags() {
        let fragment = parse_html_fragment("<p>One<p>Two <em>three");

        assert_eq!(
            inner_html(&fragment).unwrap(),
            "<p>One</p><p>Two <em>three</em></p>"
        );
    }

    #[test]
    fn test_find_elements_in_document_order() {
        let fragment = parse_html_fragment(
            r#"<div><img src="a.png"><p><img src="b.png"></p></div><img src="c.png">"#,
        );
        let sources: Vec<Option<String>> = find_elements(&fragment, "img")
            .iter()
            .map(|img| attribute(img, "src"))
            .collect();

        assert_eq!(
            sources,
            vec![
                Some("a.png".to_string()),
                Some("b.png".to_string()),
                Some("c.png".to_string()),
            ]
        );
    }

    #[test]
    fn test_attribute_missing() {
        let fragment = parse_html_fragment(r#"<a title="no link">text</a>"#);
        let links = find_elements(&fragment, "a");

        assert_eq!(links.len(), 1);
        assert_eq!(attribute(&links[0], "href"), None);
        assert_eq!(attribute(&links[0], "title"), Some("no link".to_string()));
    }

    #[test]
    fn test_text_content_concatenates_descendants() {
        let fragment = parse_html_fragment("<p>Some <em>emphasised</em> text</p>");

        assert_eq!(text_content(&fragment), "Some emphasised text");
    }

    #[test]
    fn test_rewrite_text_nodes_keeps_structure() {
        let fragment = parse_html_fragment("<p>cat <b>cat</b></p>");
        rewrite_text_nodes(&fragment, &|text: &str| {
            text.contains("cat").then(|| text.replace("cat", "dog"))
        });

        let paragraph = &find_elements(&fragment, "p")[0];
        assert_eq!(outer_html(paragraph).unwrap(), "<p>dog <b>dog</b></p>");
    }
}
