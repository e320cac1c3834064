//! Self-contained HTML viewer of the output tree: the tag hierarchy, per-tag
//! record counts and links to the static assets.

use crate::aggregate::TagCollection;

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize)]
pub struct ViewerTotals {
    pub tags: usize,
    pub records: usize,
    pub assets: usize,
}

/// One level of the tag hierarchy, keyed by its dotted prefix.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ViewerNode {
    pub label: String,
    pub children: Vec<String>,
    /// Record count per kind; empty for intermediate prefixes.
    pub counts: BTreeMap<String, usize>,
    /// Asset links relative to the viewer page.
    pub assets: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ViewerData {
    pub totals: ViewerTotals,
    pub roots: Vec<String>,
    pub nodes: BTreeMap<String, ViewerNode>,
}

const ASSET_SUFFIXES: [&str; 5] = [
    ".svg",
    "_hist.svg",
    "_melted.csv",
    "_pivot.csv",
    "_stats.csv",
];

/// Build the viewer tree from `collections`. Assets are listed when they
/// exist under `static_dir`, linked through `static_href`.
pub fn build_viewer_data(
    collections: &[TagCollection],
    static_dir: &Path,
    static_href: &str,
) -> ViewerData {
    let mut data = ViewerData::default();
    for collection in collections {
        let atoms: Vec<String> = collection.tag.atoms().iter().map(|a| a.to_string()).collect();
        let mut parent: Option<String> = None;
        for depth in 1..=atoms.len() {
            let key = atoms[..depth].join(".");
            if !data.nodes.contains_key(&key) {
                data.nodes.insert(
                    key.clone(),
                    ViewerNode {
                        label: atoms[depth - 1].clone(),
                        ..Default::default()
                    },
                );
                match &parent {
                    Some(p) => {
                        if let Some(node) = data.nodes.get_mut(p) {
                            node.children.push(key.clone());
                        }
                    }
                    None => data.roots.push(key.clone()),
                }
            }
            parent = Some(key);
        }

        let Some(node) = parent.and_then(|key| data.nodes.get_mut(&key)) else {
            continue;
        };
        for record in &collection.records {
            *node.counts.entry(record.kind().to_string()).or_default() += 1;
        }
        let rel = atoms.join("/");
        for suffix in ASSET_SUFFIXES {
            let file = format!("{rel}{suffix}");
            if static_dir.join(&file).is_file() {
                node.assets.push(format!("{}/{}", static_href.trim_end_matches('/'), file));
            }
        }
        data.totals.tags += 1;
        data.totals.records += collection.records.len();
        data.totals.assets += node.assets.len();
    }
    data
}

/// Render a self-contained HTML viewer (data embedded as JSON).
///
/// Important: we avoid `format!()` because the HTML contains many `{}` from JS
/// template literals (e.g., `${x}`), which would conflict with Rust formatting.
pub fn render_viewer(data: &ViewerData) -> anyhow::Result<String> {
    let json = serde_json::to_string(data)?;

    const TEMPLATE: &str = r#"<!doctype html>
<html>
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>trendify</title>
<style>
  body { font-family: system-ui, -apple-system, Segoe UI, Roboto, Arial, sans-serif; margin: 0; }
  header { padding: 12px 16px; border-bottom: 1px solid #ddd; }
  .container { display: flex; height: calc(100vh - 58px); }
  .sidebar { width: 360px; border-right: 1px solid #ddd; padding: 12px; overflow: auto; }
  .main { flex: 1; padding: 12px; overflow: auto; }

  .summary { display: flex; gap: 16px; flex-wrap: wrap; font-size: 14px; color: #333; }
  .pill { padding: 4px 8px; border: 1px solid #ddd; border-radius: 999px; background: #fafafa; }

  .tree-node { cursor: pointer; user-select: none; padding: 2px 4px; border-radius: 4px; }
  .tree-node:hover { background: #f3f3f3; }
  .tree-node.selected { background: #e9f2ff; border: 1px solid #cfe3ff; }
  .indent { display: inline-block; width: 16px; }
  .toggle { display: inline-block; width: 16px; text-align: center; color: #666; }
  .muted { color: #777; font-size: 12px; }

  table { border-collapse: collapse; width: 100%; margin-top: 8px; }
  th, td { border-bottom: 1px solid #eee; padding: 6px 8px; text-align: left; font-size: 14px; }
  th { position: sticky; top: 0; background: white; border-bottom: 1px solid #ddd; }
  .num { text-align: right; font-variant-numeric: tabular-nums; }
  code { font-family: ui-monospace, SFMono-Regular, Menlo, Consolas, monospace; font-size: 13px; }
</style>
</head>
<body>
<header>
  <div class="summary" id="summary"></div>
</header>

<div class="container">
  <div class="sidebar">
    <div style="display:flex; gap: 8px; margin-bottom: 8px;">
      <input id="search" placeholder="Search tag..." style="flex:1; padding: 6px 8px; border: 1px solid #ddd; border-radius: 6px;">
      <button id="expandAll" style="padding: 6px 10px;">Expand</button>
      <button id="collapseAll" style="padding: 6px 10px;">Collapse</button>
    </div>
    <div id="tree"></div>
  </div>

  <div class="main">
    <h2 id="title">Select a tag</h2>
    <div id="meta" class="muted"></div>

    <table id="countsTable" style="display:none;">
      <thead>
        <tr>
          <th>kind</th>
          <th class="num">records</th>
        </tr>
      </thead>
      <tbody id="countsBody"></tbody>
    </table>
    <div id="assets"></div>
  </div>
</div>

<script>
// Embedded tag tree (JSON object literal)
const DATA = __DATA__;

const state = {
  expanded: new Set(),
  selected: null,
  search: ""
};

function escapeHtml(s) {
  return String(s)
    .replaceAll("&", "&amp;")
    .replaceAll("<", "&lt;")
    .replaceAll(">", "&gt;")
    .replaceAll('"', "&quot;")
    .replaceAll("'", "&#39;");
}

function renderSummary() {
  const t = DATA.totals;
  const el = document.getElementById("summary");
  el.innerHTML = `
    <span class="pill">tags: <b>${t.tags}</b></span>
    <span class="pill">records: <b>${t.records}</b></span>
    <span class="pill">assets: <b>${t.assets}</b></span>
  `;
}

function nodeMatches(name) {
  if (!state.search) return true;
  return name.toLowerCase().includes(state.search.toLowerCase());
}

function totalRecords(node) {
  return Object.values(node.counts).reduce((a, b) => a + b, 0);
}

function renderTree() {
  const root = document.getElementById("tree");
  root.innerHTML = "";

  // If search is active, show matches + ancestors in the spanning tree.
  const mustShow = new Set();
  if (state.search) {
    const parent = new Map();
    for (const [name, node] of Object.entries(DATA.nodes)) {
      for (const c of node.children) parent.set(c, name);
    }
    for (const [name, node] of Object.entries(DATA.nodes)) {
      if (nodeMatches(name)) {
        let cur = name;
        while (cur) {
          mustShow.add(cur);
          cur = parent.get(cur);
        }
      }
    }
  }

  function renderSubtree(name, depth) {
    const node = DATA.nodes[name];
    if (!node) return;

    if (state.search && !mustShow.has(name)) return;

    const isExpanded = state.expanded.has(name);
    const hasKids = node.children && node.children.length > 0;

    const row = document.createElement("div");
    row.className = "tree-node" + (state.selected === name ? " selected" : "");
    row.onclick = () => selectNode(name);

    const indent = document.createElement("span");
    indent.className = "indent";
    indent.style.width = (depth * 16) + "px";
    row.appendChild(indent);

    const toggle = document.createElement("span");
    toggle.className = "toggle";
    toggle.textContent = hasKids ? (isExpanded ? "▾" : "▸") : " ";
    toggle.onclick = (e) => {
      e.stopPropagation();
      if (!hasKids) return;
      if (isExpanded) state.expanded.delete(name);
      else state.expanded.add(name);
      renderTree();
    };
    row.appendChild(toggle);

    const label = document.createElement("span");
    const n = totalRecords(node);
    label.innerHTML = escapeHtml(node.label) + (n ? ` <span class="muted">(${n} records)</span>` : "");
    row.appendChild(label);

    root.appendChild(row);

    if (hasKids && isExpanded) {
      for (const c of node.children) renderSubtree(c, depth + 1);
    }
  }

  for (const r of DATA.roots) renderSubtree(r, 0);
}

function selectNode(name) {
  state.selected = name;
  const node = DATA.nodes[name];
  document.getElementById("title").textContent = name;
  document.getElementById("meta").textContent =
    `records: ${totalRecords(node)} | children: ${node.children.length}`;

  const tbl = document.getElementById("countsTable");
  const body = document.getElementById("countsBody");
  body.innerHTML = "";
  const kinds = Object.entries(node.counts);
  if (kinds.length === 0) {
    tbl.style.display = "none";
  } else {
    tbl.style.display = "table";
    for (const [kind, count] of kinds) {
      const tr = document.createElement("tr");
      tr.innerHTML = `<td><code>${escapeHtml(kind)}</code></td><td class="num">${count}</td>`;
      body.appendChild(tr);
    }
  }

  const assets = document.getElementById("assets");
  assets.innerHTML = "";
  for (const href of node.assets) {
    const div = document.createElement("div");
    if (href.endsWith(".svg")) {
      div.innerHTML = `<img src="${escapeHtml(href)}" alt="${escapeHtml(href)}">`;
    } else {
      div.innerHTML = `<a href="${escapeHtml(href)}">${escapeHtml(href)}</a>`;
    }
    assets.appendChild(div);
  }

  renderTree();
}

function expandAll() {
  for (const name of Object.keys(DATA.nodes)) {
    const node = DATA.nodes[name];
    if (node.children && node.children.length) state.expanded.add(name);
  }
  renderTree();
}

function collapseAll() {
  state.expanded.clear();
  renderTree();
}

document.getElementById("search").addEventListener("input", (e) => {
  state.search = e.target.value || "";
  renderTree();
});

document.getElementById("expandAll").onclick = expandAll;
document.getElementById("collapseAll").onclick = collapseAll;

renderSummary();
for (const r of DATA.roots) state.expanded.add(r);
renderTree();
if (DATA.roots.length) selectNode(DATA.roots[0]);
</script>
</body>
</html>
"#;

    Ok(TEMPLATE.replace("__DATA__", &json))
}
