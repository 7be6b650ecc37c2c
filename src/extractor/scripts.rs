//! JavaScript snippets executed in the page through WebDriver

pub const READY_STATE: &str = "return document.readyState";

pub const SCROLL_HEIGHT: &str = "return document.body.scrollHeight";

/// `arguments[0]`: vertical offset in pixels
pub const SCROLL_TO: &str = "window.scrollTo(0, arguments[0]);";

pub const VIDEO_LINKS: &str = r#"
return Array.from(document.querySelectorAll('a[href*="/video/"]'))
    .map(a => a.href)
    .filter(href => !!href);
"#;

pub const EMBED_FRAMES: &str = r#"
return Array.from(document.querySelectorAll('iframe[src*="/embed/"]'))
    .map(f => f.src.split('?')[0])
    .filter(src => !!src);
"#;

pub const HASHTAG_CARDS: &str = r#"
return Array.from(document.querySelectorAll('.CardPc_titleText__RYOWo'))
    .map(e => e.innerText.replace(/#/g, '').trim())
    .filter(tag => !!tag);
"#;

pub const VIEW_MORE: &str = r#"
const button = document.querySelector('[data-testid="cc_contentArea_viewmore_btn"]');
if (button) { button.click(); return true; }
return false;
"#;

/// `arguments[0]`: zero-based topic option index
pub const SELECT_TOPIC: &str = r#"
const option = document.querySelector(
    '[data-type="select-option"][data-option-id="SelectOption' + arguments[0] + '"] .byted-list-item-container');
if (!option) { throw new Error('topic option ' + arguments[0] + ' not found'); }
option.click();
"#;

pub const EMBED_CARD: &str = r#"
const text = (selector) => {
    const el = document.querySelector(selector);
    return el ? el.innerText : null;
};
let stats = [];
try {
    stats = Array.from(document.querySelectorAll('[data-e2e="Player-Layer-LayerText"]'))
        .map(e => e.innerText);
} catch (e) {
    stats = [];
}
return {
    song: text('[data-e2e="video-v2-Card-CardMusic"]'),
    userid: text('[data-e2e="video-v2-Card-CardUserSpan"]'),
    stats: stats
};
"#;
