use crate::foundation::error::{ToonError, ToonResult};

/// Output label of the mixed audio in [`BackgroundMix::filter_graph`].
pub const MIX_LABEL: &str = "mix";

/// Additive background-music layer, expressed as an ffmpeg filter graph.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackgroundMix {
    pub volume: f32,
    pub sample_rate: u32,
    pub channels: u16,
}

impl BackgroundMix {
    pub fn new(volume: f32, sample_rate: u32, channels: u16) -> ToonResult<Self> {
        if !(volume.is_finite() && (0.0..=1.0).contains(&volume)) {
            return Err(ToonError::validation(format!(
                "background volume {volume} must be within [0, 1]"
            )));
        }
        if sample_rate == 0 {
            return Err(ToonError::validation("background mix sample rate is zero"));
        }
        if !(1..=2).contains(&channels) {
            return Err(ToonError::validation(format!(
                "background mix supports mono or stereo, got {channels} channels"
            )));
        }
        Ok(Self {
            volume,
            sample_rate,
            channels,
        })
    }

    pub fn channel_layout(&self) -> &'static str {
        if self.channels == 1 { "mono" } else { "stereo" }
    }

    /// Filter graph mixing input `background` under input `primary`.
    ///
    /// Both inputs are brought to the output layout. The background is attenuated and summed
    /// with the primary (never replacing it), the result lasts as long as the primary, and the
    /// final conversion to 16-bit clamps the sum to full scale. The background input is expected
    /// to loop (`-stream_loop -1`), so a short track repeats and a long one is cut.
    pub fn filter_graph(&self, primary: usize, background: usize) -> String {
        let fmt = format!(
            "aformat=sample_fmts=fltp:sample_rates={}:channel_layouts={}",
            self.sample_rate,
            self.channel_layout()
        );
        format!(
            "[{primary}:a:0]{fmt}[pri];\
             [{background}:a:0]{fmt},volume={:.4}[bg];\
             [pri][bg]amix=inputs=2:duration=first:dropout_transition=0:normalize=0,\
             aformat=sample_fmts=s16[{MIX_LABEL}]",
            self.volume
        )
    }
}

#[cfg(test)]
#[path = "../../tests/unit/audio/mix.rs"]
mod tests;
