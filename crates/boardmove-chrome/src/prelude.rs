//! Script installed into the destination page.
//!
//! It keeps a registry from element to numeric id so the engine can hold on
//! to nodes across calls, and exposes one function per surface operation
//! under `window.__boardmove`. Ids are weak: a node removed from the document
//! makes every later call on its id throw.

use boardmove_core::MigrationResult;

use crate::selectors::SelectorProfile;

/// Function taking the selector profile. Installing twice only refreshes the
/// selectors, so existing ids stay valid.
pub(crate) const PRELUDE: &str = r#"(function (sel) {
  const existing = window.__boardmove;
  if (existing && existing.version === 1) {
    existing.sel = sel;
    return true;
  }

  const refs = new Map();
  const ids = new WeakMap();
  let next = 1;
  const ref = (el) => {
    if (!el) return null;
    let id = ids.get(el);
    if (id === undefined) {
      id = next++;
      ids.set(el, id);
      refs.set(id, new WeakRef(el));
    }
    return id;
  };
  const node = (id) => {
    const held = refs.get(id);
    const el = held ? held.deref() : undefined;
    if (!el || !el.isConnected) {
      refs.delete(id);
      throw new Error('node ' + id + ' is no longer in the document');
    }
    return el;
  };

  const S = () => window.__boardmove.sel;
  const all = (root, selector) => Array.from((root || document).querySelectorAll(selector));
  const prefixed = (prefix) => `[${S().index_attribute}^="${prefix}"]`;
  const exact = (value) => `[${S().index_attribute}="${value}"]`;
  const scope = (within) => (within == null ? document : node(within));
  const buttonsWithText = (root, text) =>
    all(root, 'button').filter((b) => (b.textContent || '').trim().includes(text));
  const editors = (root) => all(root, `${prefixed(S().rich_text_prefix)}.${S().editor_class}`);

  const queries = {
    columnTitles: () => all(document, prefixed(S().column_title_prefix)),
    columnHosts: () => all(document, prefixed(S().column_host_prefix)),
    columnTitle: (q) => all(document, exact(S().column_title_prefix + q.index)),
    columnHost: (q) => all(document, exact(S().column_host_prefix + q.index)),
    addColumnControl: () => buttonsWithText(document, S().add_column_text),
    addCardControl: (q) => all(document, exact(S().add_card_prefix + q.index + S().add_card_suffix)),
    addCardControlWithin: (q) => {
      const host = node(q.host);
      const tagged = all(host, `[${S().index_attribute}*="${S().add_card_fragment}"]`);
      return tagged.length ? tagged : buttonsWithText(host, S().add_card_text);
    },
    cards: (q) => all(document, prefixed(`${S().card_prefix}${q.column}-`)),
    cardTitleField: (q) => all(scope(q.within), S().card_title_field),
    richTextAt: (q) => all(document, exact(`${S().rich_text_prefix}${q.column}-${q.card}-0`)),
    focusedRichText: () => all(document, `${prefixed(S().rich_text_prefix)}.${S().focused_class}`),
    anyRichText: (q) => editors(scope(q.within)),
    anyEditable: () => {
      const ck = all(document, S().content_fallback);
      return ck.length ? ck : all(document, '[contenteditable="true"]:not(textarea)');
    },
    boardSurface: () => {
      for (const selector of S().board_surface) {
        const found = all(document, selector);
        if (found.length) return found;
      }
      return [];
    },
    anyCard: () => all(document, prefixed(S().card_prefix)),
    textField: (q) => all(node(q.within), 'textarea, input[type="text"]'),
  };
  const run = (q) => {
    const query = queries[q.query];
    if (!query) throw new Error('unknown query ' + q.query);
    return query(q);
  };

  const makeEvent = (ev) => {
    const base = { bubbles: true, cancelable: true };
    switch (ev.kind) {
      case 'mouse':
        return new MouseEvent(ev.name, { ...base, view: window, clientX: ev.x ?? 0, clientY: ev.y ?? 0 });
      case 'keyboard':
        return new KeyboardEvent(ev.name, {
          ...base,
          key: ev.key,
          code: ev.code,
          keyCode: ev.keyCode,
          which: ev.keyCode,
          charCode: ev.name === 'keypress' ? ev.keyCode : 0,
        });
      case 'input':
        return new InputEvent(ev.name, { ...base, inputType: ev.inputType, data: ev.data ?? null });
      default:
        return new Event(ev.name, base);
    }
  };

  const api = {
    queryAll: (q) => run(q).map(ref),
    closest: (id, q) => {
      const candidates = new Set(run(q));
      for (let el = node(id); el; el = el.parentElement) {
        if (candidates.has(el)) return ref(el);
      }
      return null;
    },
    attribute: (id, name) => node(id).getAttribute(name),
    textContent: (id) => node(id).textContent || '',
    isVisible: (id) => node(id).offsetParent !== null,
    isDisabled: (id) => {
      const el = node(id);
      return !!el.disabled || el.getAttribute('aria-disabled') === 'true';
    },
    boundingRect: (id) => {
      const r = node(id).getBoundingClientRect();
      return { left: r.left, top: r.top, width: r.width, height: r.height };
    },
    hitTest: (x, y) => ref(document.elementFromPoint(x, y)),
    dispatch: (target, ev) => {
      (target == null ? document : node(target)).dispatchEvent(makeEvent(ev));
      return true;
    },
    click: (id) => { node(id).click(); return true; },
    focus: (id) => { node(id).focus(); return true; },
    blurActive: () => {
      const active = document.activeElement;
      if (active instanceof HTMLElement) active.blur();
      return true;
    },
    scrollIntoView: (id) => {
      node(id).scrollIntoView({ block: 'nearest', inline: 'nearest' });
      return true;
    },
    selectContents: (id) => {
      const el = node(id);
      if (typeof el.select === 'function') {
        el.select();
        return true;
      }
      const range = document.createRange();
      range.selectNodeContents(el);
      const selection = window.getSelection();
      selection.removeAllRanges();
      selection.addRange(range);
      return true;
    },
    execCommand: (cmd) => {
      switch (cmd.command) {
        case 'insertText': return document.execCommand('insertText', false, cmd.value);
        case 'selectAll': return document.execCommand('selectAll', false, null);
        case 'delete': return document.execCommand('delete', false, null);
      }
      throw new Error('unknown command ' + cmd.command);
    },
    setValue: (id, value) => { node(id).value = value; return true; },
    editorSetData: (id, html) => {
      const instance = node(id).ckeditorInstance;
      if (!instance) return false;
      instance.setData(html);
      return true;
    },
    replaceParagraphText: (id, text) => {
      const el = node(id);
      const paragraph = el.querySelector('p');
      if (paragraph) {
        paragraph.textContent = text;
      } else {
        const created = document.createElement('p');
        created.textContent = text;
        el.replaceChildren(created);
      }
      return true;
    },
  };

  window.__boardmove = {
    version: 1,
    sel,
    call: (name, args) => {
      const fn = api[name];
      if (!fn) throw new Error('unknown call ' + name);
      return fn(...args);
    },
  };
  return true;
})"#;

/// Expression installing the prelude with `selectors`.
pub(crate) fn install_script(selectors: &SelectorProfile) -> MigrationResult<String> {
    Ok(format!("{}({})", PRELUDE, serde_json::to_string(selectors)?))
}

/// Expression invoking one prelude function. Evaluates to `{ missing: true }`
/// when the prelude is not installed, e.g. after a navigation.
pub(crate) fn call_script(name: &str, args: &serde_json::Value) -> MigrationResult<String> {
    Ok(format!(
        "(() => {{ const bm = window.__boardmove; if (!bm) return {{ missing: true }}; \
         const value = bm.call({}, {}); return {{ value: value === undefined ? null : value }}; }})()",
        serde_json::to_string(name)?,
        args
    ))
}
