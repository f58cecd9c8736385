use ammonia;
use pulldown_cmark::{Options, Parser, html};

/// Renders note markdown to HTML and cleans it with ammonia.
///
/// Notes are written by the admin but shown to every visitor, so raw HTML
/// embedded in the markdown goes through the same whitelist as everything
/// else: safe tags (like <b>, <p>, <table>) stay, <script>, <iframe> and
/// event-handler attributes are stripped.
pub fn render_markdown(input: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);

    let parser = Parser::new_ext(input, options);
    let mut rendered = String::new();
    html::push_html(&mut rendered, parser);
    ammonia::clean(&rendered)
}
