pub const PANEL_STYLE_ID: &str = "cgpt-note-panel-style";

pub const PANEL_CSS: &str = r#"
#cgpt-note-panel {
  position: fixed; top: 80px; right: 16px; z-index: 2147483000;
  width: 340px; max-height: calc(100vh - 120px);
  display: flex; flex-direction: column; gap: 8px;
  padding: 10px 12px; border-radius: 12px;
  background: #fff; color: #1f2328; border: 1px solid rgba(0,0,0,0.12);
  box-shadow: 0 8px 30px rgba(0,0,0,0.18);
  font: 13px/1.4 system-ui, -apple-system, "Segoe UI", sans-serif;
}
#cgpt-note-panel[data-collapsed="true"] > :not(.cgpt-note-header):not(style) { display: none !important; }
#cgpt-note-panel.cgpt-note-panel-attention { animation: cgpt-note-pulse 600ms ease-out; }
#cgpt-note-panel.cgpt-note-dragging { opacity: 0.92; }
@keyframes cgpt-note-pulse { 0% { box-shadow: 0 0 0 0 rgba(16,163,127,0.55); } 100% { box-shadow: 0 0 0 14px rgba(16,163,127,0); } }
.cgpt-note-header { display: flex; justify-content: space-between; align-items: center; cursor: grab; user-select: none; }
.cgpt-note-title { font-weight: 600; margin-right: 6px; }
.cgpt-note-counter { opacity: 0.65; font-size: 12px; }
.cgpt-note-header-actions, .cgpt-note-item-actions { display: flex; gap: 4px; }
.cgpt-note-btn, .cgpt-note-icon-btn, .cgpt-tag-preset, .cgpt-set-note-btn {
  border: 1px solid rgba(0,0,0,0.15); border-radius: 6px; background: transparent;
  padding: 3px 8px; font: inherit; font-size: 12px; cursor: pointer; color: inherit;
}
.cgpt-note-btn.primary { background: #10a37f; border-color: #10a37f; color: #fff; }
.cgpt-note-btn.ghost { border-color: transparent; }
.cgpt-note-btn[disabled] { opacity: 0.5; cursor: default; }
.cgpt-note-icon-btn.danger { color: #c62828; }
.cgpt-note-composer { display: none; flex-direction: column; gap: 6px; }
.cgpt-note-composer[data-open="true"] { display: flex; }
.cgpt-note-composer textarea { min-height: 120px; resize: vertical; font: inherit; padding: 6px; }
.cgpt-note-composer-actions { display: flex; gap: 6px; justify-content: flex-end; }
.cgpt-note-toolbar { display: flex; align-items: flex-start; gap: 8px; }
.cgpt-tag-filter { flex-wrap: wrap; gap: 6px; align-items: center; }
.cgpt-tag-preset[data-active="true"] { background: #10a37f; border-color: #10a37f; color: #fff; }
.cgpt-tag-editor { display: flex; flex-direction: column; gap: 4px; }
.cgpt-tag-editor.cgpt-tag-limit { outline: 2px solid #c62828; border-radius: 6px; }
.cgpt-tag-editor-top, .cgpt-tag-chip-list, .cgpt-tag-preset-row { display: flex; flex-wrap: wrap; gap: 4px; align-items: center; }
.cgpt-tag-editor-top { justify-content: space-between; }
.cgpt-tag-chip, .cgpt-note-tag { display: inline-flex; gap: 2px; align-items: center; padding: 1px 6px; border-radius: 999px; background: rgba(16,163,127,0.12); font-size: 11px; }
.cgpt-tag-chip-remove { border: none; background: none; cursor: pointer; padding: 0 2px; }
.cgpt-tag-input { font: inherit; padding: 3px 6px; }
.cgpt-note-list { overflow-y: auto; display: flex; flex-direction: column; gap: 8px; min-height: 0; }
.cgpt-note-item { border: 1px solid rgba(0,0,0,0.1); border-radius: 8px; padding: 8px 10px; background: #fafafa; }
.cgpt-note-item.cgpt-note-highlight { border-color: #10a37f; background: rgba(16,163,127,0.08); }
.cgpt-note-item-header { display: flex; justify-content: space-between; align-items: center; gap: 6px; }
.cgpt-note-meta { display: flex; gap: 8px; font-size: 11px; opacity: 0.75; }
.cgpt-note-tags { display: flex; flex-wrap: wrap; gap: 4px; margin-top: 4px; }
.cgpt-note-text { white-space: pre-wrap; word-break: break-word; margin: 6px 0 0; font: 12px/1.45 ui-monospace, monospace; max-height: 240px; overflow: auto; }
.cgpt-note-edit-area { display: flex; flex-direction: column; gap: 6px; margin-top: 6px; }
.cgpt-note-edit-input { min-height: 220px; max-height: 800px; resize: vertical; font: 12px/1.45 ui-monospace, monospace; padding: 6px; border: 1px solid rgba(0,0,0,0.15); border-radius: 6px; }
.cgpt-note-edit-tags { font: inherit; padding: 4px 6px; border: 1px solid rgba(0,0,0,0.15); border-radius: 6px; }
.cgpt-note-undo-inline {
  display: flex; justify-content: space-between; align-items: center; gap: 12px;
  border: 1px dashed rgba(0,0,0,0.2); border-radius: 8px; padding: 10px 12px; background: rgba(0,0,0,0.02);
}
.cgpt-note-empty { opacity: 0.65; font-size: 12px; padding: 8px 0; }
.cgpt-set-note-btn { margin-left: 6px; }
"#;
