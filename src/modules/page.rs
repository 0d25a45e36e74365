//! In-memory model of the dashboard page.
//!
//! The page is parsed once from the served HTML. Handlers receive [`Element`]
//! handles resolved at initialization and mutate the shared document through
//! them; nothing looks elements up by id after binding.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use scraper::{ElementRef, Html, Selector};

use crate::modules::error::DashboardError;
use crate::modules::render::escape_html;

#[derive(Debug, Clone, Default)]
struct Node {
    tag: String,
    attrs: BTreeMap<String, String>,
    styles: BTreeMap<String, String>,
    value: String,
    disabled: bool,
    inner_html: String,
    text: String,
    parent: Option<usize>,
    children: Vec<usize>,
    attached: bool,
}

#[derive(Debug)]
struct Document {
    source: String,
    nodes: Vec<Node>,
    body: usize,
}

/// Shared handle to the page document.
#[derive(Debug, Clone)]
pub struct Page {
    doc: Arc<Mutex<Document>>,
}

/// Handle to one element of a [`Page`].
#[derive(Debug, Clone)]
pub struct Element {
    page: Page,
    index: usize,
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && Arc::ptr_eq(&self.page.doc, &other.page.doc)
    }
}

fn document_order(html: &Html) -> Vec<ElementRef<'_>> {
    html.root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .collect()
}

fn parse_styles(style: &str) -> BTreeMap<String, String> {
    style
        .split(';')
        .filter_map(|decl| {
            let (name, value) = decl.split_once(':')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some((name.to_lowercase(), value.trim().to_string()))
        })
        .collect()
}

fn fragment_text(html: &str) -> String {
    Html::parse_fragment(html).root_element().text().collect()
}

impl Document {
    /// Detaches every node below `index`.
    fn detach_descendants(&mut self, index: usize) {
        let mut pending = std::mem::take(&mut self.nodes[index].children);
        while let Some(child) = pending.pop() {
            let node = &mut self.nodes[child];
            node.attached = false;
            pending.extend(node.children.iter().copied());
        }
    }
}

impl Page {
    pub fn from_html(source: &str) -> Self {
        let html = Html::parse_document(source);
        let elements = document_order(&html);
        let positions: HashMap<_, usize> = elements
            .iter()
            .enumerate()
            .map(|(i, el)| (el.id(), i))
            .collect();

        let mut nodes: Vec<Node> = Vec::with_capacity(elements.len());
        let mut body = 0;
        for (i, el) in elements.iter().enumerate() {
            let value_el = el.value();
            let tag = value_el.name().to_string();
            let attrs: BTreeMap<String, String> = value_el
                .attrs()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            let text: String = el.text().collect();
            let value = match tag.as_str() {
                "textarea" => text.clone(),
                _ => attrs.get("value").cloned().unwrap_or_default(),
            };
            let parent = el
                .parent()
                .and_then(ElementRef::wrap)
                .and_then(|p| positions.get(&p.id()).copied());
            if tag == "body" {
                body = i;
            }
            nodes.push(Node {
                styles: attrs.get("style").map(|s| parse_styles(s)).unwrap_or_default(),
                disabled: attrs.contains_key("disabled"),
                inner_html: el.inner_html(),
                tag,
                attrs,
                value,
                text,
                parent,
                children: Vec::new(),
                attached: true,
            });
            if let Some(p) = parent {
                nodes[p].children.push(i);
            }
        }

        Page {
            doc: Arc::new(Mutex::new(Document {
                source: source.to_string(),
                nodes,
                body,
            })),
        }
    }

    fn doc(&self) -> MutexGuard<'_, Document> {
        self.doc.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn handle(&self, index: usize) -> Element {
        Element {
            page: self.clone(),
            index,
        }
    }

    pub fn body(&self) -> Element {
        let body = self.doc().body;
        self.handle(body)
    }

    pub fn element_by_id(&self, id: &str) -> Option<Element> {
        let index = self
            .doc()
            .nodes
            .iter()
            .position(|n| n.attached && n.attrs.get("id").is_some_and(|v| v == id))?;
        Some(self.handle(index))
    }

    /// Elements of the served page matching a CSS selector, in document order.
    ///
    /// Elements created after load are never matched.
    pub fn select(&self, css: &str) -> Result<Vec<Element>, DashboardError> {
        let selector = Selector::parse(css).map_err(|e| DashboardError::Selector {
            selector: css.to_string(),
            detail: e.to_string(),
        })?;
        let source = self.doc().source.clone();
        let html = Html::parse_document(&source);
        let positions: HashMap<_, usize> = document_order(&html)
            .iter()
            .enumerate()
            .map(|(i, el)| (el.id(), i))
            .collect();
        let indexes: Vec<usize> = html
            .select(&selector)
            .filter_map(|el| positions.get(&el.id()).copied())
            .collect();

        let doc = self.doc();
        let matched = indexes
            .into_iter()
            .filter(|i| doc.nodes[*i].attached)
            .collect::<Vec<_>>();
        drop(doc);
        Ok(matched.into_iter().map(|i| self.handle(i)).collect())
    }
}

impl Element {
    fn read<R>(&self, f: impl FnOnce(&Node) -> R) -> R {
        let doc = self.page.doc();
        f(&doc.nodes[self.index])
    }

    fn write<R>(&self, f: impl FnOnce(&mut Node) -> R) -> R {
        let mut doc = self.page.doc();
        f(&mut doc.nodes[self.index])
    }

    pub fn tag(&self) -> String {
        self.read(|n| n.tag.clone())
    }

    pub fn id(&self) -> Option<String> {
        self.attr("id")
    }

    pub fn attr(&self, name: &str) -> Option<String> {
        self.read(|n| n.attrs.get(name).cloned())
    }

    pub fn set_attr(&self, name: &str, value: &str) {
        self.write(|n| {
            n.attrs.insert(name.to_string(), value.to_string());
        })
    }

    /// `data-*` attribute, `key` given in kebab case (`offer-id`).
    pub fn data(&self, key: &str) -> Option<String> {
        self.attr(&format!("data-{key}"))
    }

    pub fn set_data(&self, key: &str, value: &str) {
        self.set_attr(&format!("data-{key}"), value)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.read(|n| {
            n.attrs
                .get("class")
                .is_some_and(|c| c.split_whitespace().any(|c| c == class))
        })
    }

    pub fn value(&self) -> String {
        self.read(|n| n.value.clone())
    }

    pub fn set_value(&self, value: &str) {
        self.write(|n| n.value = value.to_string())
    }

    pub fn is_disabled(&self) -> bool {
        self.read(|n| n.disabled)
    }

    pub fn set_disabled(&self, disabled: bool) {
        self.write(|n| n.disabled = disabled)
    }

    pub fn style(&self, name: &str) -> Option<String> {
        self.read(|n| n.styles.get(name).cloned())
    }

    pub fn set_style(&self, name: &str, value: &str) {
        self.write(|n| {
            n.styles.insert(name.to_string(), value.to_string());
        })
    }

    pub fn is_displayed(&self) -> bool {
        self.style("display").is_none_or(|d| d != "none")
    }

    pub fn show(&self) {
        self.set_style("display", "block")
    }

    pub fn hide(&self) {
        self.set_style("display", "none")
    }

    pub fn inner_html(&self) -> String {
        self.read(|n| n.inner_html.clone())
    }

    /// Replaces the element's markup. Handles to anything below it are
    /// detached.
    pub fn set_inner_html(&self, html: &str) {
        let text = fragment_text(html);
        let mut doc = self.page.doc();
        doc.detach_descendants(self.index);
        let node = &mut doc.nodes[self.index];
        node.inner_html = html.to_string();
        node.text = text;
    }

    pub fn text(&self) -> String {
        self.read(|n| n.text.clone())
    }

    pub fn set_text(&self, text: &str) {
        self.set_inner_html(&escape_html(text))
    }

    pub fn is_attached(&self) -> bool {
        self.read(|n| n.attached)
    }

    pub fn parent(&self) -> Option<Element> {
        self.read(|n| n.parent).map(|p| self.page.handle(p))
    }

    pub fn children(&self) -> Vec<Element> {
        let doc = self.page.doc();
        let live: Vec<usize> = doc.nodes[self.index]
            .children
            .iter()
            .copied()
            .filter(|c| doc.nodes[*c].attached)
            .collect();
        drop(doc);
        live.into_iter().map(|c| self.page.handle(c)).collect()
    }

    /// Creates a new element and appends it as the last child.
    pub fn append_child(&self, tag: &str, class: &str, inner_html: &str) -> Element {
        let text = fragment_text(inner_html);
        let mut doc = self.page.doc();
        let index = doc.nodes.len();
        let mut attrs = BTreeMap::new();
        if !class.is_empty() {
            attrs.insert("class".to_string(), class.to_string());
        }
        doc.nodes.push(Node {
            tag: tag.to_string(),
            attrs,
            inner_html: inner_html.to_string(),
            text,
            parent: Some(self.index),
            attached: true,
            ..Node::default()
        });
        doc.nodes[self.index].children.push(index);
        drop(doc);
        self.page.handle(index)
    }

    pub fn remove(&self) {
        let mut doc = self.page.doc();
        doc.nodes[self.index].attached = false;
        doc.detach_descendants(self.index);
        if let Some(parent) = doc.nodes[self.index].parent {
            let index = self.index;
            doc.nodes[parent].children.retain(|c| *c != index);
        }
    }

    fn is_descendant_of(&self, ancestor: &Element) -> bool {
        let mut current = self.parent();
        while let Some(el) = current {
            if el == *ancestor {
                return true;
            }
            current = el.parent();
        }
        false
    }

    /// First descendant of the served markup matching `css`.
    pub fn query(&self, css: &str) -> Result<Option<Element>, DashboardError> {
        Ok(self
            .page
            .select(css)?
            .into_iter()
            .find(|el| el.is_descendant_of(self)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<!doctype html>
<html><body>
  <div id="alert-container"></div>
  <form>
    <div class="field">
      <input type="text" id="id_instagram_username" value="  coffee_sf ">
      <button type="button" id="fetch-instagram-data" disabled>Fetch</button>
      <div id="instagram-loading" style="display: none; color: red"></div>
    </div>
    <textarea id="id_caption_text">Great latte</textarea>
    <div class="upload"><input type="file" name="proof"><div class="file-preview"></div></div>
  </form>
  <button class="btn claim-offer-btn" data-offer-id="42">Claim</button>
</body></html>"#;

    #[test]
    fn reads_served_state() {
        let page = Page::from_html(PAGE);
        let input = page.element_by_id("id_instagram_username").unwrap();
        assert_eq!(input.tag(), "input");
        assert_eq!(input.value(), "  coffee_sf ");

        let button = page.element_by_id("fetch-instagram-data").unwrap();
        assert!(button.is_disabled());

        let spinner = page.element_by_id("instagram-loading").unwrap();
        assert!(!spinner.is_displayed());
        assert_eq!(spinner.style("color").as_deref(), Some("red"));

        let caption = page.element_by_id("id_caption_text").unwrap();
        assert_eq!(caption.value(), "Great latte");

        assert_eq!(page.body().tag(), "body");
        assert!(page.element_by_id("nope").is_none());
    }

    #[test]
    fn select_maps_to_handles() {
        let page = Page::from_html(PAGE);
        let claims = page.select(".claim-offer-btn").unwrap();
        assert_eq!(claims.len(), 1);
        assert_eq!(claims[0].data("offer-id").as_deref(), Some("42"));
        assert!(claims[0].has_class("btn"));

        let inputs = page.select(r#"input[type="file"]"#).unwrap();
        let preview = inputs[0].parent().unwrap().query(".file-preview").unwrap();
        assert!(preview.is_some());

        assert!(page.select("[[").is_err());
    }

    #[test]
    fn append_and_remove_children() {
        let page = Page::from_html(PAGE);
        let container = page.element_by_id("alert-container").unwrap();
        let first = container.append_child("div", "alert alert-info", "one <b>bold</b>");
        let second = container.append_child("div", "alert alert-danger", "two");
        assert_eq!(container.children(), vec![first.clone(), second.clone()]);
        assert_eq!(first.text(), "one bold");
        assert!(first.has_class("alert-info"));

        first.remove();
        assert!(!first.is_attached());
        assert_eq!(container.children(), vec![second]);
    }

    #[test]
    fn inner_html_replaces_children() {
        let page = Page::from_html(PAGE);
        let upload = page.select(".upload").unwrap().remove(0);
        let preview = upload.query(".file-preview").unwrap().unwrap();
        upload.set_inner_html("<p>gone</p>");
        assert!(!preview.is_attached());
        assert_eq!(upload.text(), "gone");

        let caption = page.element_by_id("id_caption_text").unwrap();
        caption.set_text("<script>");
        assert_eq!(caption.inner_html(), "&lt;script&gt;");
        assert_eq!(caption.text(), "<script>");
    }

    #[test]
    fn replaced_markup_detaches_whole_subtree() {
        let page = Page::from_html(PAGE);
        let form = page.select("form").unwrap().remove(0);
        let username = page.element_by_id("id_instagram_username").unwrap();
        form.set_inner_html("<p>replaced</p>");

        assert!(!username.is_attached());
        assert!(page.element_by_id("id_instagram_username").is_none());
        assert!(page.element_by_id("instagram-loading").is_none());
        assert!(page.select(".file-preview").unwrap().is_empty());
        assert!(page.element_by_id("alert-container").is_some());
    }

    #[test]
    fn removed_element_takes_descendants_along() {
        let page = Page::from_html(PAGE);
        let field = page.select(".field").unwrap().remove(0);
        field.remove();

        assert!(page.element_by_id("fetch-instagram-data").is_none());
        assert!(page.select("input#id_instagram_username").unwrap().is_empty());
        assert_eq!(page.select(r#"input[type="file"]"#).unwrap().len(), 1);
    }

    #[test]
    fn show_hide_and_disable() {
        let page = Page::from_html(PAGE);
        let spinner = page.element_by_id("instagram-loading").unwrap();
        spinner.show();
        assert!(spinner.is_displayed());
        spinner.hide();
        assert!(!spinner.is_displayed());

        let button = page.element_by_id("fetch-instagram-data").unwrap();
        button.set_disabled(false);
        assert!(!button.is_disabled());
    }
}
