use crate::background::model_background;
use crate::config::DepolluteOpts;
use crate::detect::detect_foreground;
use crate::errors::Result;
use crate::image::*;
use crate::log_utils::TimeLogger;
use crate::progress::ProgressTs;

pub struct DepolluteResult {
    pub mask:      ImageMask,
    pub model:     Image,
    pub corrected: Image,
}

/// Full pipeline: detect foreground stars, model the sky background around
/// them, subtract it. The input image is left untouched; model and corrected
/// rasters share its dimensions and channel population.
pub fn depollute(
    image:    &Image,
    opts:     &DepolluteOpts,
    progress: &ProgressTs,
) -> Result<DepolluteResult> {
    let thread_pool = rayon::ThreadPoolBuilder::new()
        .num_threads(opts.cpu_load.to_threads_count())
        .build()?;

    let total_log = TimeLogger::start();
    let result = thread_pool.install(|| -> Result<DepolluteResult> {
        progress.lock().unwrap().stage("Detecting foreground stars...");
        let mask = detect_foreground(image, &opts.detection)?;
        progress.lock().unwrap().percent(40, 100, "stars detected");

        progress.lock().unwrap().stage("Modeling and removing sky glow...");
        let (model, corrected) = model_background(image, &mask, &opts.model)?;
        progress.lock().unwrap().percent(100, 100, "done");

        Ok(DepolluteResult { mask, model, corrected })
    })?;
    total_log.log("depollute TOTAL");

    Ok(result)
}
