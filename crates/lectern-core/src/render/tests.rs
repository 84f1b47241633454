use super::*;

fn render_md(raw: &str) -> String {
    ContentRenderer::default().render(raw, ContentFormat::Markdown)
}

fn render_html(raw: &str) -> String {
    ContentRenderer::default().render(raw, ContentFormat::Html)
}

#[test]
fn renders_heading_and_paragraph() {
    let html = render_md("# Archive Notes\n\nPlain body.");
    assert_eq!(html, "<h1>Archive Notes</h1>\n<p>Plain body.</p>");
}

#[test]
fn heading_keeps_trailing_hash_without_space() {
    assert_eq!(render_md("## About C#"), "<h2>About C#</h2>");
    assert_eq!(render_md("## Closed ##"), "<h2>Closed</h2>");
}

#[test]
fn renders_emphasis() {
    let html = render_md("**bold** and *ital* and ***both***");
    assert_eq!(
        html,
        "<p><strong>bold</strong> and <em>ital</em> and <em><strong>both</strong></em></p>",
    );
}

#[test]
fn intra_word_underscores_stay_literal() {
    let html = render_md("the calc_mode flag and foo_bar_baz");
    assert!(!html.contains("<em>"), "{html}");
}

#[test]
fn code_span_shields_markup() {
    let html = render_md("use `run_fast::<T>()` here");
    assert_eq!(html, "<p>use <code>run_fast::&lt;T&gt;()</code> here</p>");
}

#[test]
fn renders_lists() {
    let html = render_md("- alpha\n- beta\n\n1. one\n2) two");
    assert_eq!(
        html,
        "<ul><li>alpha</li><li>beta</li></ul>\n<ol><li>one</li><li>two</li></ol>",
    );
}

#[test]
fn blockquote_joins_continuation_lines() {
    let html = render_md("> first line\n> second line");
    assert_eq!(html, "<blockquote><p>first line second line</p></blockquote>");
}

#[test]
fn renders_horizontal_rule() {
    let html = render_md("above\n\n---\n\nbelow");
    assert_eq!(html, "<p>above</p>\n<hr>\n<p>below</p>");
}

#[test]
fn fenced_code_is_protected_from_every_pass() {
    let html = render_md("```cpp\nint a = x<y>(1);\n**raw** [link](u)\n```");
    assert!(html.starts_with("<pre><code class=\"language-cpp\">"), "{html}");
    assert!(html.contains("x&lt;y&gt;(1);"), "{html}");
    assert!(html.contains("**raw** [link](u)"), "{html}");
    assert!(!html.contains("<strong>"), "{html}");
}

#[test]
fn unterminated_fence_still_renders_as_code() {
    let html = render_md("intro\n\n```\nlet tail = 1;");
    assert_eq!(html, "<p>intro</p>\n<pre><code>let tail = 1;</code></pre>");
}

#[test]
fn highlight_shortcode_pair_acts_as_fence() {
    let html = render_md("{{< highlight cpp >}}\ntemplate <class T>\n{{< /highlight >}}");
    assert_eq!(
        html,
        "<pre><code class=\"language-cpp\">template &lt;class T&gt;</code></pre>",
    );
}

#[test]
fn youtube_shortcode_becomes_link_button() {
    let html = render_md("{{< youtube dQw4w9WgXcQ >}}");
    assert_eq!(
        html,
        "<a class=\"external-link-button\" href=\"https://www.youtube.com/watch?v=dQw4w9WgXcQ\" \
         target=\"_blank\" rel=\"noopener noreferrer\">Watch on YouTube</a>",
    );
    assert!(!html.contains("iframe"));
}

#[test]
fn youtube_shortcode_accepts_named_id() {
    let html = render_md("{{< youtube id=\"abc12345678\" >}}");
    assert!(html.contains("href=\"https://www.youtube.com/watch?v=abc12345678\""));
    assert!(html.contains(">Watch on YouTube</a>"));
    assert!(!html.contains("iframe"));
}

#[test]
fn invalid_video_id_drops_shortcode() {
    assert_eq!(render_md("{{< youtube short >}}"), "");
}

#[test]
fn vimeo_tweet_and_gist_expand_to_buttons() {
    let vimeo = render_md("{{< vimeo 123456789 >}}");
    assert!(vimeo.contains("https://vimeo.com/123456789"), "{vimeo}");
    assert!(vimeo.contains("Watch on Vimeo"), "{vimeo}");

    let tweet = render_md("{{< tweet user=\"llvmorg\" id=\"1234567890\" >}}");
    assert!(
        tweet.contains("https://twitter.com/llvmorg/status/1234567890"),
        "{tweet}",
    );

    let bare_tweet = render_md("{{< tweet 1234567890 >}}");
    assert!(
        bare_tweet.contains("https://twitter.com/i/status/1234567890"),
        "{bare_tweet}",
    );

    let gist = render_md("{{< gist llvmbot 9ae4a2a8cd9f6e6f8f73 >}}");
    assert!(
        gist.contains("https://gist.github.com/llvmbot/9ae4a2a8cd9f6e6f8f73"),
        "{gist}",
    );
}

#[test]
fn unknown_shortcode_renders_nothing() {
    assert_eq!(render_md("{{< gallery dir=\"img\" >}}"), "");
}

#[test]
fn figure_resolves_source_against_base() {
    let html = render_md("{{< figure src=\"slides/intro.png\" title=\"Intro\" >}}");
    assert_eq!(
        html,
        "<figure><img src=\"https://llvm.org/devmtg/slides/intro.png\">\
         <figcaption><strong>Intro</strong></figcaption></figure>",
    );
}

#[test]
fn figure_with_bad_source_disappears() {
    assert_eq!(render_md("{{< figure src=\"javascript:x()\" >}}"), "");
}

#[test]
fn relref_inside_link_resolves() {
    let html = render_md("[All talks]({{< relref \"2024-10/talks.html\" >}})");
    assert_eq!(
        html,
        "<p><a href=\"https://llvm.org/devmtg/2024-10/talks.html\" target=\"_blank\" \
         rel=\"noopener noreferrer\">All talks</a></p>",
    );
}

#[test]
fn reference_links_resolve_case_insensitively() {
    let doc = "See [the schedule][SCHED] and [missing][nope].\n\n\
               [sched]: https://llvm.org/devmtg/2024-10/ \"Schedule\"";
    let html = render_md(doc);
    assert!(
        html.contains(
            "<a href=\"https://llvm.org/devmtg/2024-10/\" title=\"Schedule\" \
             target=\"_blank\" rel=\"noopener noreferrer\">the schedule</a>",
        ),
        "{html}",
    );
    assert!(html.contains("[missing][nope]."), "{html}");
    assert!(!html.contains("[sched]:"), "{html}");
}

#[test]
fn reference_definition_line_vanishes_even_when_target_is_bad() {
    let html = render_md("[x]: javascript:alert(1)\n\ntext");
    assert_eq!(html, "<p>text</p>");
}

#[test]
fn restricted_inline_tags_survive_without_attributes() {
    let html = render_md("Press <kbd>F1</kbd> or <span>now</span>");
    assert_eq!(
        html,
        "<p>Press <kbd>F1</kbd> or &lt;span&gt;now&lt;/span&gt;</p>",
    );
}

#[test]
fn rejected_link_target_keeps_label() {
    let html = render_md("[hello](javascript:alert(1)) **world**");
    assert_eq!(html, "<p><a>hello</a> <strong>world</strong></p>");
}

#[test]
fn stripped_scheme_leaves_surrounding_emphasis_intact() {
    let html = render_md("Hello **world** [link](javascript:alert(1))");
    assert_eq!(html, "<p>Hello <strong>world</strong> <a>link</a></p>");
}

#[test]
fn renders_inline_image() {
    let html = render_md("![Logo](img/logo.png \"LLVM\")");
    assert_eq!(
        html,
        "<p><img src=\"https://llvm.org/devmtg/img/logo.png\" alt=\"Logo\" title=\"LLVM\"></p>",
    );
}

#[test]
fn rejected_image_degrades_to_alt_text() {
    assert_eq!(render_md("![diagram](javascript:x())"), "<p>diagram</p>");
}

#[test]
fn html_block_in_markdown_is_sanitized() {
    let html = render_md("<div style=\"text-align: center\">\ncentered text\n</div>");
    assert_eq!(html, "<div class=\"centered\">\ncentered text\n</div>");
}

#[test]
fn sanitizer_removes_script_with_content() {
    let html = render_html("<p>a</p><script>alert(1)</script><p>b</p>");
    assert_eq!(html, "<p>a</p><p>b</p>");
}

#[test]
fn sanitizer_strips_event_handlers() {
    let html = render_html("<p onclick=\"x()\" id=\"k\">hi</p>");
    assert_eq!(html, "<p id=\"k\">hi</p>");
}

#[test]
fn sanitizer_decodes_entities_before_scheme_check() {
    let html = render_html("<a href=\"java&#115;cript:alert(1)\">x</a>");
    assert_eq!(html, "<a>x</a>");
}

#[test]
fn sanitizer_translates_styles_to_classes() {
    assert_eq!(
        render_html("<span style=\"font-family: Courier New\">mono</span>"),
        "<span class=\"inline-mono\">mono</span>",
    );
    assert_eq!(
        render_html("<span style=\"font-size: 28px\">Big</span>"),
        "<span class=\"heading-like\">Big</span>",
    );
    assert_eq!(
        render_html("<p style=\"color: red\">plain</p>"),
        "<p>plain</p>",
    );
}

#[test]
fn sanitizer_forces_new_tab_on_external_anchors() {
    let html = render_html("<a href=\"https://example.com/x\" target=\"_self\">x</a>");
    assert_eq!(
        html,
        "<a href=\"https://example.com/x\" target=\"_blank\" rel=\"noopener noreferrer\">x</a>",
    );
}

#[test]
fn sanitizer_resolves_relative_targets() {
    let html = render_html("<a href=\"slides.html\">s</a>");
    assert!(
        html.starts_with("<a href=\"https://llvm.org/devmtg/slides.html\""),
        "{html}",
    );
}

#[test]
fn sanitizer_keeps_fragment_links_as_is() {
    let html = render_html("<a href=\"#schedule\">jump</a>");
    assert_eq!(html, "<a href=\"#schedule\">jump</a>");
}

#[test]
fn data_uris_are_image_only() {
    let img = render_html("<img src=\"data:image/png;base64,AAAA\">");
    assert!(img.contains("src=\"data:image/png;base64,AAAA\""), "{img}");
    let anchor = render_html("<a href=\"data:text/html,x\">x</a>");
    assert_eq!(anchor, "<a>x</a>");
}

#[test]
fn sanitizer_drops_iframe_and_its_content() {
    let html = render_html("before<iframe src=\"https://evil\"><p>inner</p></iframe>after");
    assert_eq!(html, "beforeafter");
}

#[test]
fn sanitizer_always_drops_srcset() {
    let html = render_html("<img src=\"a.png\" srcset=\"a.png 1x, b.png 2x\">");
    assert_eq!(html, "<img src=\"https://llvm.org/devmtg/a.png\">");
}

#[test]
fn sanitizer_drops_form_and_metadata_tags() {
    let html = render_html("<meta charset=\"x\"><form action=\"https://x\"><input></form><p>k</p>");
    assert_eq!(html, "<p>k</p>");
}

#[test]
fn sanitizer_skips_doctype_and_comments() {
    let html = render_html("<!DOCTYPE html><!-- note --><p>x</p>");
    assert_eq!(html, "<p>x</p>");
}

#[test]
fn stray_angle_bracket_is_neutralized() {
    let html = render_html("5 < 6 stays true");
    assert_eq!(html, "5 &lt; 6 stays true");
}

#[test]
fn bare_pre_gets_code_block_class() {
    assert_eq!(
        render_html("<pre>raw dump</pre>"),
        "<pre class=\"code-block\">raw dump</pre>",
    );
}

#[test]
fn code_inside_pre_gets_code_class() {
    assert_eq!(
        render_html("<pre><code>y</code></pre>"),
        "<pre><code class=\"code\">y</code></pre>",
    );
}

#[test]
fn multiline_lone_code_is_promoted_to_block() {
    assert_eq!(
        render_html("<code>a\nb</code>"),
        "<pre><code class=\"code\">a\nb</code></pre>",
    );
}

#[test]
fn single_line_lone_code_stays_inline() {
    assert_eq!(render_html("<code>x + y</code>"), "<code>x + y</code>");
}

#[test]
fn sanitizer_output_is_stable_under_reruns() {
    let raw = "<div style=\"text-align:center\"><a href=\"talks.html\">a</a>\
               <pre><code>x</code></pre><code>m\nn</code>5 < 6</div>";
    let once = render_html(raw);
    let twice = render_html(&once);
    assert_eq!(once, twice);
}

#[test]
fn html_format_leaves_markdown_syntax_alone() {
    assert_eq!(render_html("**not bold**"), "**not bold**");
}

#[test]
fn placeholder_roundtrip_handles_nesting() {
    let mut store = PlaceholderStore::new();
    let inner = store.stash("<code>x</code>".to_string());
    let outer = store.stash(format!("<a>{inner}</a>"));
    assert_eq!(store.restore_all(outer), "<a><code>x</code></a>");
}

#[test]
fn placeholder_token_detection_is_exact() {
    let mut store = PlaceholderStore::new();
    let token = store.stash("<hr>".to_string());
    assert!(store.is_token(&token));
    assert!(!store.is_token(&format!("{token} trailing")));
    assert!(!store.is_token("lectern-ph-deadbeef-0z"));
}

#[test]
fn escape_helpers_cover_quotes() {
    assert_eq!(escape_html("a<b> & \"c\""), "a&lt;b&gt; &amp; &quot;c&quot;");
    assert_eq!(escape_attr("it's"), "it&#39;s");
}
