use crate::models::{FaceAnalysis, GenerationStatus};
use crate::view::html::render_document;
use crate::view::{el, text, Element, Node};
use crate::workflow::app::PaywallState;
use crate::workflow::fanout::{StyleSlots, FAILURE_TEXT};
use crate::workflow::progress::ProgressDisplay;
use crate::workflow::screens::{ScreenController, ScreenId};
use crate::workflow::upload::UploadStageView;
use crate::workflow::viewer::{ViewerSession, DIVIDER_MAX, DIVIDER_MIN, DIVIDER_START, WHEEL_STEP};

pub const PAGE_TITLE: &str = "AI 헤어스타일 컨설팅";
pub const LOADING_TEXT: &str = "AI 합성 중...";
const PAYMENT_IDLE_TEXT: &str = "전체 결과 잠금 해제";
const PAYMENT_BUSY_TEXT: &str = "결제 처리중...";

const STYLESHEET: &str = "\
body{margin:0;font-family:sans-serif;background:#0f0f13;color:#f4f4f6}\
.hidden{display:none!important}\
.screen{max-width:720px;margin:0 auto;padding:24px}\
.notice{background:#5b1d1d;padding:12px 16px;border-radius:8px;margin:16px auto;max-width:680px}\
.preview img{max-width:100%;border-radius:12px}\
.placeholder{border:2px dashed #555;border-radius:12px;padding:48px;text-align:center}\
.style-card{background:#1b1b22;border-radius:12px;padding:16px;margin:12px 0}\
.locked-card{filter:blur(1px);opacity:.6;text-align:center}\
.best-match{border:2px solid #c7a4ff}\
.tag{display:inline-block;margin-right:8px;color:#c7a4ff}\
.result-img{width:100%;border-radius:8px;cursor:zoom-in}\
.loader.failed{color:#ff7b7b}\
button[disabled]{opacity:.5}";

/// Everything the workflow exposes to a full-page render.
pub struct AppView<'a> {
    pub screens: &'a ScreenController,
    pub upload: UploadStageView,
    pub progress: &'a ProgressDisplay,
    pub analysis: Option<&'a FaceAnalysis>,
    pub original_image: Option<&'a str>,
    pub slots: Option<&'a StyleSlots>,
    pub paywall: &'a PaywallState,
    pub notice: Option<&'a str>,
}

fn screen(id: ScreenId, active: bool) -> Element {
    el("section")
        .id(id.dom_id())
        .class("screen")
        .class(if active { "active" } else { "hidden" })
}

pub fn upload_screen(view: &UploadStageView) -> Element {
    let preview = match &view.preview {
        Some(preview) => {
            let mut frame = el("div").class("preview").child(
                el("img")
                    .id("preview-img")
                    .attr("src", preview.data_uri.clone())
                    .attr("alt", "업로드한 사진"),
            );
            if let Some((width, height)) = preview.dimensions {
                frame = frame.child(
                    el("span")
                        .id("preview-size")
                        .text(format!("{width} × {height}px")),
                );
            }
            frame
        }
        None => el("div")
            .class("placeholder")
            .text("정면 사진을 올려주세요"),
    };

    el("div")
        .class("upload-stage")
        .child(el("h1").text(PAGE_TITLE))
        .child(preview)
        .child(
            el("input")
                .id("file-input")
                .attr("type", "file")
                .attr("name", crate::server::multipart::IMAGE_FIELD)
                .attr("accept", "image/*"),
        )
        .child(
            el("button")
                .id("btn-analyze")
                .attr("type", "submit")
                .flag("disabled", !view.analyze_enabled)
                .text("얼굴형 분석하기"),
        )
}

pub fn analyzing_screen(progress: &ProgressDisplay) -> Element {
    el("div")
        .class("analyzing-stage")
        .attr("data-state", if progress.is_running() { "running" } else { "stopped" })
        .child(
            el("svg")
                .attr("viewBox", "0 0 120 120")
                .child(
                    el("circle")
                        .id("progress-ring")
                        .attr("cx", "60")
                        .attr("cy", "60")
                        .attr("r", "54")
                        .attr("stroke-dasharray", "339.3")
                        .attr("stroke-dashoffset", format!("{:.1}", progress.ring_offset())),
                ),
        )
        .child(el("div").id("progress-pct").text(progress.label()))
        .child(el("p").id("analysis-status").text(progress.phase().message()))
}

/// One visible best-match card; the rest stay locked until payment.
pub fn teaser_screen(analysis: &FaceAnalysis, paywall: &PaywallState) -> Element {
    let mut cards = el("div").id("style-cards-container");
    if let Some(best) = analysis.best_match() {
        cards = cards.child(
            el("div")
                .class("style-card")
                .class("best-match")
                .child(el("span").class("badge").text("BEST MATCH"))
                .child(el("div").class("match-score").text(format!("{}%", best.match_score)))
                .child(
                    el("p").text(format!("{} 얼굴형에 가장 잘 어울리는 스타일", analysis.face_type)),
                ),
        );
    }
    for _ in analysis.recommendations.iter().skip(1) {
        cards = cards.child(
            el("div")
                .class("style-card")
                .class("locked-card")
                .child(el("span").class("lock").text("🔒"))
                .child(el("span").text("HIDDEN")),
        );
    }

    let button_text = if paywall.processing {
        PAYMENT_BUSY_TEXT
    } else {
        PAYMENT_IDLE_TEXT
    };

    let mut unlock = el("button")
        .id("btn-unlock")
        .flag("disabled", paywall.processing)
        .text(button_text);
    if let Some(method) = &paywall.method {
        unlock = unlock.attr("data-method", method.clone());
    }

    el("div")
        .class("teaser-stage")
        .child(el("span").id("face-type-badge").text(analysis.face_type.clone()))
        .child(cards)
        .child(unlock)
}

fn style_slot(index: usize, slots: Option<&StyleSlots>) -> Element {
    let slot = slots.and_then(|slots| slots.get(index));
    let mut image = el("img")
        .id(format!("result-img-{index}"))
        .class("result-img")
        .attr("data-compare-index", index.to_string());
    let mut loader = el("div").id(format!("loader-{index}")).class("loader");

    match slot.map(|slot| &slot.status) {
        Some(GenerationStatus::Ready { image_data }) => {
            image = image.attr("src", image_data.clone());
            loader = loader.class("hidden");
        }
        Some(GenerationStatus::Failed) => {
            image = image.class("hidden");
            loader = loader.class("failed").text(FAILURE_TEXT);
        }
        Some(GenerationStatus::Pending) | None => {
            image = image.class("hidden");
            loader = loader.text(LOADING_TEXT);
        }
    }

    let mut container = el("div").class("style-image").child(image).child(loader);
    if let Some(slot) = slot {
        if slot.image_data().is_some() {
            if let Some(status_text) = &slot.status_text {
                container = container.child(el("p").class("style-note").text(status_text.clone()));
            }
        }
    }
    container
}

pub fn full_results_screen(
    analysis: &FaceAnalysis,
    original_image: &str,
    slots: Option<&StyleSlots>,
) -> Element {
    let mut tags = el("div")
        .id("face-analysis-tags")
        .child(el("span").class("tag").text(format!("#{}", analysis.face_type)));
    for feature in analysis.headline_features() {
        tags = tags.child(el("span").class("tag").text(format!("#{feature}")));
    }

    let tips = el("ul").id("salon-tips").children(analysis.recommendations.iter().map(|rec| {
        el("li")
            .child(el("strong").text(rec.name.clone()))
            .text(format!(" {}", rec.styling_tip))
    }));

    let cards = el("div")
        .id("full-style-cards")
        .children(analysis.recommendations.iter().enumerate().map(|(index, rec)| {
            el("div")
                .class("style-card")
                .attr("data-index", index.to_string())
                .child(style_slot(index, slots))
                .child(el("h3").text(rec.name.clone()))
                .child(el("div").class("match-score").text(format!("{}% Match", rec.match_score)))
                .child(el("p").text(rec.description.clone()))
        }));

    el("div")
        .class("report-stage")
        .child(
            el("img")
                .id("report-selfie")
                .attr("src", original_image.to_string())
                .attr("alt", "원본 사진"),
        )
        .child(tags)
        .child(el("p").id("face-analysis-desc").text(analysis.analysis_description.clone()))
        .child(tips)
        .child(cards)
}

/// All four screens, exactly one of them active.
pub fn app_view(view: AppView<'_>) -> Node {
    let mut root = el("main").id("app");
    if let Some(notice) = view.notice {
        root = root.child(el("div").class("notice").attr("role", "alert").text(notice));
    }

    let shown = |id: ScreenId| view.screens.is_active(id);
    let upload =
        screen(ScreenId::Upload, shown(ScreenId::Upload)).child(upload_screen(&view.upload));
    let analyzing = screen(ScreenId::Analyzing, shown(ScreenId::Analyzing))
        .child(analyzing_screen(view.progress));

    let mut teaser = screen(ScreenId::ResultsBlur, shown(ScreenId::ResultsBlur));
    let mut full = screen(ScreenId::ResultsFull, shown(ScreenId::ResultsFull));
    if let Some(analysis) = view.analysis {
        teaser = teaser.child(teaser_screen(analysis, view.paywall));
        full = full.child(full_results_screen(
            analysis,
            view.original_image.unwrap_or_default(),
            view.slots,
        ));
    }

    root.child(upload)
        .child(analyzing)
        .child(teaser)
        .child(full)
        .into_node()
}

fn stylesheet() -> Node {
    el("style").text(STYLESHEET).into_node()
}

/// Wraps a rendered tree in a standalone page.
pub fn page(body: &Node) -> String {
    render_document(PAGE_TITLE, &[stylesheet()], body)
}

const UPLOAD_SCRIPT: &str = "\
const input=document.getElementById('file-input');\
const button=document.getElementById('btn-analyze');\
input.addEventListener('change',()=>{button.disabled=!(input.files&&input.files.length);});";

const API_NOTE: &str = "이 페이지는 분석 API를 직접 호출하며 결과를 JSON으로 돌려줍니다. \
진행률, 티저, 잠금 해제, 스타일 합성까지 이어지는 전체 상담은 \
`facestyle consult --image <사진>` 명령으로 실행하세요.";

/// Landing page served at `/`: the upload screen posting straight to the
/// analyze endpoint. The full consultation runs through `consult`.
pub fn upload_page() -> String {
    let form = el("form")
        .attr("method", "post")
        .attr("action", "/api/analyze")
        .attr("enctype", "multipart/form-data")
        .child(upload_screen(&UploadStageView::from_image(None)));
    let body = el("main")
        .id("app")
        .child(
            screen(ScreenId::Upload, true)
                .child(form)
                .child(el("p").id("api-note").class("notice").text(API_NOTE)),
        )
        .child(el("script").text(UPLOAD_SCRIPT))
        .into_node();
    page(&body)
}

const VIEWER_SCRIPT: &str = "\
const frame=document.getElementById('compare-frame');\
const after=document.getElementById('compare-after');\
const handle=document.getElementById('compare-handle');\
let pos=__START__,dragging=false;\
function apply(p){pos=Math.min(__MAX__,Math.max(__MIN__,p));after.style.clipPath='inset(0 0 0 '+pos+'%)';handle.style.left=pos+'%';}\
function track(x){const r=frame.getBoundingClientRect();if(r.width>0){apply((x-r.left)/r.width*100);}}\
frame.addEventListener('mousedown',e=>{dragging=true;track(e.clientX);});\
window.addEventListener('mousemove',e=>{if(dragging){track(e.clientX);}});\
window.addEventListener('mouseup',()=>{dragging=false;});\
frame.addEventListener('touchstart',e=>{dragging=true;track(e.touches[0].clientX);},{passive:true});\
frame.addEventListener('touchmove',e=>{if(dragging){track(e.touches[0].clientX);}},{passive:true});\
frame.addEventListener('touchend',()=>{dragging=false;});\
frame.addEventListener('wheel',e=>{e.preventDefault();if(e.deltaY>0){apply(pos+__STEP__);}else if(e.deltaY<0){apply(pos-__STEP__);}},{passive:false});";

fn viewer_script() -> String {
    VIEWER_SCRIPT
        .replace("__START__", &DIVIDER_START.to_string())
        .replace("__MIN__", &DIVIDER_MIN.to_string())
        .replace("__MAX__", &DIVIDER_MAX.to_string())
        .replace("__STEP__", &WHEEL_STEP.to_string())
}

pub fn comparison_view(session: &ViewerSession) -> Node {
    el("div")
        .id("compare-modal")
        .child(el("h2").id("compare-label").text(session.label().to_string()))
        .child(
            el("div")
                .id("compare-frame")
                .attr("style", "position:relative;user-select:none;touch-action:none")
                .child(
                    el("img")
                        .id("compare-before")
                        .attr("src", session.before_image().to_string())
                        .attr("alt", "Before")
                        .attr("style", "width:100%;display:block"),
                )
                .child(
                    el("img")
                        .id("compare-after")
                        .attr("src", session.after_image().to_string())
                        .attr("alt", "After")
                        .attr(
                            "style",
                            format!(
                                "position:absolute;inset:0;width:100%;clip-path:{}",
                                session.clip_path()
                            ),
                        ),
                )
                .child(
                    el("div")
                        .id("compare-handle")
                        .attr(
                            "style",
                            format!(
                                "position:absolute;top:0;bottom:0;width:2px;background:#fff;left:{:.2}%",
                                session.position()
                            ),
                        ),
                ),
        )
        .child(el("script").child(text(viewer_script())))
        .into_node()
}

pub fn comparison_page(session: &ViewerSession) -> String {
    page(&comparison_view(session))
}
