/// Names of the pipeline stages, in order.
pub const STEP_NAMES: [&str; 6] = [
    "Parsing 3D model",
    "Processing textures",
    "Generating drawable XML",
    "Generating collision",
    "Converting to GTA V binary",
    "Packaging FiveM resource",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    pub step: usize,
    pub total_steps: usize,
    pub step_name: &'static str,
    pub message: String,
    pub percent: u32,
}

pub type ProgressFn<'a> = dyn FnMut(Progress) + 'a;

pub fn emit(callback: &mut ProgressFn<'_>, step: usize, message: impl Into<String>) {
    callback(Progress {
        step,
        total_steps: STEP_NAMES.len(),
        step_name: STEP_NAMES.get(step).copied().unwrap_or("Processing"),
        message: message.into(),
        percent: (((step as f32 + 0.5) / STEP_NAMES.len() as f32) * 100.0).round() as u32,
    });
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn reports_step_names_and_percent() {
        let mut seen = Vec::new();
        {
            let mut callback = |progress: Progress| seen.push(progress);
            emit(&mut callback, 0, "loading");
            emit(&mut callback, 5, "done");
        }
        assert_eq!("Parsing 3D model", seen[0].step_name);
        assert_eq!(8, seen[0].percent);
        assert_eq!("Packaging FiveM resource", seen[1].step_name);
        assert_eq!(92, seen[1].percent);
    }
}
