use wayfinder_config::{BrowserSettings, StealthLevel};

const BASE_ARGS: &[&str] = &[
    "--start-maximized",
    "--disable-blink-features=AutomationControlled",
    "--disable-infobars",
];

const BALANCED_ARGS: &[&str] = &[
    "--disable-dev-shm-usage",
    "--disable-extensions",
    "--disable-plugins-discovery",
];

const HEADLESS_ARGS: &[&str] = &["--headless=new", "--disable-gpu"];

/// Hides `navigator.webdriver` and fills in what a stock Chrome exposes.
const NAVIGATOR_PATCH: &str = r#"
    Object.defineProperty(navigator, 'webdriver', { get: () => undefined });
    Object.defineProperty(navigator, 'languages', { get: () => ['en-US', 'en'] });
    if (!window.chrome) window.chrome = { runtime: {} };
"#;

/// Adds single-bit noise to 2D canvas exports.
const CANVAS_NOISE: &str = r#"
    const origGetContext = HTMLCanvasElement.prototype.getContext;
    HTMLCanvasElement.prototype.getContext = function (type, ...rest) {
        const ctx = origGetContext.call(this, type, ...rest);
        if (type === '2d' && ctx) {
            const origToDataURL = this.toDataURL;
            this.toDataURL = function (...a) {
                const img = ctx.getImageData(0, 0, this.width, this.height);
                for (let i = 0; i < img.data.length; i += 4) {
                    if (Math.random() < 0.001) img.data[i] += Math.random() < 0.5 ? -1 : 1;
                }
                ctx.putImageData(img, 0, 0);
                return origToDataURL.apply(this, a);
            };
        }
        return ctx;
    };
"#;

/// Chrome command line for a session: fixed flags, then the level's extras,
/// then headless flags, then whatever the user configured.
pub fn chrome_arguments(settings: &BrowserSettings) -> Vec<String> {
    let level_args: &[&str] = match settings.stealth {
        StealthLevel::Balanced => BALANCED_ARGS,
        StealthLevel::Lightweight => &[],
    };
    let headless_args: &[&str] = if settings.headless { HEADLESS_ARGS } else { &[] };

    BASE_ARGS
        .iter()
        .chain(level_args)
        .chain(headless_args)
        .map(|s| s.to_string())
        .chain(settings.extra_args.iter().cloned())
        .collect()
}

/// Page scripts to run after every navigation, in order.
pub fn page_patches(level: StealthLevel) -> &'static [&'static str] {
    match level {
        StealthLevel::Lightweight => &[NAVIGATOR_PATCH],
        StealthLevel::Balanced => &[NAVIGATOR_PATCH, CANVAS_NOISE],
    }
}
