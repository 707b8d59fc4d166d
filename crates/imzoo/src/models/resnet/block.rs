//! # `ResNet` Residual Blocks
//!
//! A [`ResidualBlock`] is a branch of [`ConvNorm2d`] layers plus a shortcut;
//! the shortcut is added before the last `ReLU`.
//!
//! | kind         | branch                                     | expansion |
//! |--------------|--------------------------------------------|-----------|
//! | `Basic`      | ``3x3/s, 3x3``                              | 1         |
//! | `Bottleneck` | ``1x1, 3x3/s (grouped), 1x1``               | 4         |
//!
//! The shortcut is the identity, or a ``1x1/s`` conv and norm when the
//! stride or the channel count changes.

use crate::layers::blocks::conv_norm::{ConvNorm2d, ConvNorm2dConfig};
use crate::layers::norm::NormalizationConfig;
use crate::utility::init::CONV_INTO_RELU_INITIALIZER;
use bimm_contracts::{assert_shape_contract_periodically, unpack_shape_contract};
use burn::config::Config;
use burn::module::Module;
use burn::nn::PaddingConfig2d;
use burn::nn::conv::Conv2dConfig;
use burn::prelude::{Backend, Tensor};

/// The residual block kind.
#[derive(Config, Debug, PartialEq, Eq, Copy)]
pub enum BlockKind {
    /// Two ``3x3`` convs.
    Basic,

    /// ``1x1`` reduce, ``3x3``, ``1x1`` expand.
    Bottleneck,
}

impl BlockKind {
    /// Ratio of output planes to the block's `planes`.
    pub fn expansion(&self) -> usize {
        match self {
            Self::Basic => 1,
            Self::Bottleneck => 4,
        }
    }

    /// Number of convs on the residual branch.
    pub fn branch_len(&self) -> usize {
        match self {
            Self::Basic => 2,
            Self::Bottleneck => 3,
        }
    }
}

/// The resolution after a strided ``3x3 pad 1`` or ``1x1`` conv.
pub fn strided_resolution(
    resolution: [usize; 2],
    stride: usize,
) -> [usize; 2] {
    resolution.map(|d| d.div_ceil(stride))
}

/// [`ResidualBlock`] Config.
#[derive(Config, Debug)]
pub struct ResidualBlockConfig {
    /// The block kind.
    pub kind: BlockKind,

    /// Number of input planes.
    pub in_planes: usize,

    /// Base planes; the block emits ``planes * kind.expansion()``.
    pub planes: usize,

    /// Stride of the block.
    #[config(default = 1)]
    pub stride: usize,

    /// Groups of the bottleneck ``3x3`` conv.
    #[config(default = 1)]
    pub groups: usize,

    /// Bottleneck width per group, relative to 64.
    #[config(default = 64)]
    pub width_per_group: usize,

    /// Norm policy.
    #[config(default = "NormalizationConfig::default()")]
    pub norm: NormalizationConfig,
}

impl ResidualBlockConfig {
    /// Number of output planes.
    pub fn out_planes(&self) -> usize {
        self.planes * self.kind.expansion()
    }

    /// Width of the bottleneck ``3x3`` conv.
    pub fn width(&self) -> usize {
        match self.kind {
            BlockKind::Basic => self.planes,
            BlockKind::Bottleneck => self.planes * self.width_per_group / 64 * self.groups,
        }
    }

    fn conv(
        &self,
        channels: [usize; 2],
        kernel: usize,
        stride: usize,
    ) -> ConvNorm2dConfig {
        let padding = kernel / 2;
        ConvNorm2dConfig::new(
            Conv2dConfig::new(channels, [kernel, kernel])
                .with_stride([stride, stride])
                .with_padding(PaddingConfig2d::Explicit(padding, padding))
                .with_bias(false)
                .with_initializer(CONV_INTO_RELU_INITIALIZER),
        )
        .with_norm(self.norm.clone())
    }

    /// The residual branch.
    pub fn branch(&self) -> Vec<ConvNorm2dConfig> {
        let (in_planes, out_planes, stride) = (self.in_planes, self.out_planes(), self.stride);
        match self.kind {
            BlockKind::Basic => vec![
                self.conv([in_planes, self.planes], 3, stride),
                self.conv([self.planes, out_planes], 3, 1),
            ],
            BlockKind::Bottleneck => {
                let width = self.width();
                let mut grouped = self.conv([width, width], 3, stride);
                grouped.conv = grouped.conv.with_groups(self.groups);
                vec![
                    self.conv([in_planes, width], 1, 1),
                    grouped,
                    self.conv([width, out_planes], 1, 1),
                ]
            }
        }
    }

    /// The projection shortcut, if the block changes stride or channels.
    pub fn shortcut(&self) -> Option<ConvNorm2dConfig> {
        if self.stride == 1 && self.in_planes == self.out_planes() {
            return None;
        }
        let mut shortcut = self.conv([self.in_planes, self.out_planes()], 1, self.stride);
        shortcut.relu = false;
        Some(shortcut)
    }

    /// Check if the config is valid.
    pub fn try_validate(&self) -> Result<(), String> {
        if self.kind == BlockKind::Basic && (self.groups != 1 || self.width_per_group != 64) {
            return Err("basic blocks require groups=1 and width_per_group=64".to_string());
        }
        if self.stride == 0 {
            return Err("stride must be positive".to_string());
        }
        if self.groups == 0 || self.width_per_group == 0 {
            return Err("groups and width_per_group must be positive".to_string());
        }
        if self.width() % self.groups != 0 {
            return Err(format!(
                "width({}) is not divisible by groups({})",
                self.width(),
                self.groups
            ));
        }
        let branch = self.branch();
        let shortcut = self.shortcut();
        branch
            .iter()
            .chain(shortcut.iter())
            .try_for_each(|conv| conv.try_validate())
    }

    /// Initialize a [`ResidualBlock`].
    ///
    /// # Panics
    ///
    /// If the config is not valid.
    pub fn init<B: Backend>(
        &self,
        device: &B::Device,
    ) -> ResidualBlock<B> {
        if let Err(err) = self.try_validate() {
            panic!("{}", err);
        }
        ResidualBlock {
            branch: self.branch().iter().map(|c| c.init(device)).collect(),
            shortcut: self.shortcut().map(|c| c.init(device)),
        }
    }
}

/// `ResNet` residual block.
#[derive(Module, Debug)]
pub struct ResidualBlock<B: Backend> {
    /// The residual branch; the last layer receives the shortcut.
    pub branch: Vec<ConvNorm2d<B>>,

    /// Projection shortcut; `None` is the identity.
    pub shortcut: Option<ConvNorm2d<B>>,
}

impl<B: Backend> ResidualBlock<B> {
    /// Number of input planes.
    pub fn in_planes(&self) -> usize {
        self.branch.first().map(|c| c.in_channels()).unwrap_or_default()
    }

    /// Number of output planes.
    pub fn out_planes(&self) -> usize {
        self.branch.last().map(|c| c.out_channels()).unwrap_or_default()
    }

    /// Stride of the block.
    pub fn stride(&self) -> usize {
        self.branch.iter().map(|c| c.stride()).product()
    }

    /// Forward Pass.
    ///
    /// # Arguments
    ///
    /// - `input`: ``[batch, in_planes, in_height, in_width]``.
    ///
    /// # Returns
    ///
    /// ``[batch, out_planes, in_height / stride, in_width / stride]``, rounding up.
    pub fn forward(
        &self,
        input: Tensor<B, 4>,
    ) -> Tensor<B, 4> {
        let [batch, in_height, in_width] = unpack_shape_contract!(
            ["batch", "in_planes", "in_height", "in_width"],
            &input,
            &["batch", "in_height", "in_width"],
            &[("in_planes", self.in_planes())]
        );
        let [out_height, out_width] = strided_resolution([in_height, in_width], self.stride());

        let identity = match &self.shortcut {
            Some(shortcut) => shortcut.forward(input.clone()),
            None => input.clone(),
        };

        let (last, head) = match self.branch.split_last() {
            Some(split) => split,
            None => return input,
        };
        let x = head.iter().fold(input, |x, layer| layer.forward(x));
        let x = last.forward_residual(x, Some(identity));

        assert_shape_contract_periodically!(
            ["batch", "out_planes", "out_height", "out_width"],
            &x,
            &[
                ("batch", batch),
                ("out_planes", self.out_planes()),
                ("out_height", out_height),
                ("out_width", out_width)
            ]
        );

        x
    }

    /// Zero the scale of the last branch norm.
    ///
    /// The block then starts as its shortcut, followed by a `ReLU`.
    pub fn zero_init_last_norm(&mut self) {
        if let Some(last) = self.branch.last_mut() {
            last.zero_init_norm();
        }
    }
}
