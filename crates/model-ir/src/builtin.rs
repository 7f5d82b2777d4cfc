// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The compiled 28x28 digit classifier.
//!
//! Two conv + pool stages, two dense layers and a softmax:
//!
//! ```text
//! input [1,1,28,28] ─► conv2d_0 3x3/16 + pool 2 ─► [1,16,13,13]
//!                   ─► conv2d_2 3x3/32 + pool 2 ─► [1,32,5,5]  (viewed as [1,800,1,1])
//!                   ─► gemm_5 800→128 ─► gemm_6 128→10 ─► nl_7 softmax ─► [1,10,1,1]
//! ```
//!
//! Offsets, arena sizes and quantization tables are the ones the compiler
//! emitted. Weight values are not part of the graph; hosts supply a blob of
//! [`WEIGHTS_BYTES`] bytes laid out at the offsets below.

#![allow(clippy::excessive_precision)]

use arena_mapper::{ArenaDecl, ArenaLayout};
use tensor_core::{ArrayDef, ArrayId, Axis, DType, QuantParams, Shape, TensorDesc};

use crate::{ConvPoolConfig, LayerNode, LayerOp, ModelGraph, ModelInfo, SoftmaxConfig};

/// Declared weights arena size.
pub const WEIGHTS_BYTES: usize = 109_176;
/// Declared activations arena size.
pub const ACTIVATIONS_BYTES: usize = 9_712;

/// Builds the digit classifier graph in the `Loaded` state.
pub fn digit_classifier() -> ModelGraph {
    let mut g = ModelGraph::new(
        ModelInfo {
            name: "network".into(),
            signature: "0x4eef88a2a886f8cf7fbf7937b4c52f30".into(),
            datetime: "2025-12-17T15:32:49+0100".into(),
            numeric_signature: 0xf533_89be,
            n_macc: 772_944,
            batches: 1,
        },
        ArenaLayout {
            weights: ArenaDecl::single(WEIGHTS_BYTES),
            activations: ArenaDecl::single(ACTIVATIONS_BYTES),
        },
    );

    // ── Arrays ─────────────────────────────────────────────────────

    let a_c0_w = g.push_array(ArrayDef::persistent("conv2d_0_weights", DType::I8, 144, 0));
    let a_c0_b = g.push_array(ArrayDef::persistent("conv2d_0_bias", DType::I32, 16, 144));
    let a_c2_w = g.push_array(ArrayDef::persistent("conv2d_2_weights", DType::I8, 4_608, 208));
    let a_c2_b = g.push_array(ArrayDef::persistent("conv2d_2_bias", DType::I32, 32, 4_816));
    let a_g5_w = g.push_array(ArrayDef::persistent("gemm_5_weights", DType::I8, 102_400, 4_944));
    let a_g5_b = g.push_array(ArrayDef::persistent("gemm_5_bias", DType::I32, 128, 107_344));
    let a_g6_w = g.push_array(ArrayDef::persistent("gemm_6_weights", DType::I8, 1_280, 107_856));
    let a_g6_b = g.push_array(ArrayDef::persistent("gemm_6_bias", DType::I32, 10, 109_136));

    let a_in = g.push_array(
        ArrayDef::transient("serving_default_keras_tensor0_output", DType::I8, 784, 2_344).with_io(),
    );
    let a_c0_s0 = g.push_array(ArrayDef::transient("conv2d_0_scratch0", DType::I8, 548, 3_128));
    let a_c0_s1 = g.push_array(ArrayDef::transient("conv2d_0_scratch1", DType::I8, 832, 3_676));
    let a_c0_out = g.push_array(ArrayDef::transient("conv2d_0_output", DType::I8, 2_704, 160));
    let a_c2_s0 = g.push_array(ArrayDef::transient("conv2d_2_scratch0", DType::I8, 6_144, 2_864));
    let a_c2_s1 = g.push_array(ArrayDef::transient("conv2d_2_scratch1", DType::I8, 704, 9_008));
    let a_c2_out = g.push_array(ArrayDef::transient("conv2d_2_output", DType::I8, 800, 0));
    let a_g5_s0 = g.push_array(ArrayDef::transient("gemm_5_scratch0", DType::I16, 1_440, 800));
    let a_g5_out = g.push_array(ArrayDef::transient("gemm_5_output", DType::I8, 128, 3_680));
    let a_g6_s0 = g.push_array(ArrayDef::transient("gemm_6_scratch0", DType::I16, 178, 0));
    let a_g6_out = g.push_array(ArrayDef::transient("gemm_6_output", DType::I8, 10, 356));
    let a_nl_s0 = g.push_array(ArrayDef::transient("nl_7_scratch0", DType::I32, 124, 368));
    let a_nl_out = g.push_array(ArrayDef::transient("nl_7_output", DType::I8, 10, 0).with_io());

    // ── Tensors ────────────────────────────────────────────────────
    //
    // Pushed in the compiler's tensor order so ids match its tables.

    let c0_out_q = (0.008_740_779_012_441_635, -128);
    let c2_out_q = (0.014_715_573_750_436_306, -128);

    let t_c0_b = g.push_tensor(TensorDesc::plain("conv2d_0_bias", Shape::vector(16), a_c0_b));
    let t_c0_out = g.push_tensor(TensorDesc::activation(
        "conv2d_0_output",
        Shape::new(1, 16, 13, 13),
        a_c0_out,
        c0_out_q.0,
        c0_out_q.1,
    ));
    let t_c0_s0 = g.push_tensor(TensorDesc::plain("conv2d_0_scratch0", Shape::vector(548), a_c0_s0));
    let t_c0_s1 = g.push_tensor(TensorDesc::activation(
        "conv2d_0_scratch1",
        Shape::new(1, 16, 2, 26),
        a_c0_s1,
        c0_out_q.0,
        c0_out_q.1,
    ));
    let t_c0_w = g.push_tensor(weights("conv2d_0_weights", Shape::new(16, 1, 3, 3), a_c0_w, &CONV2D_0_W_SCALES));

    let t_c2_b = g.push_tensor(TensorDesc::plain("conv2d_2_bias", Shape::vector(32), a_c2_b));
    let t_c2_out = g.push_tensor(TensorDesc::activation(
        "conv2d_2_output",
        Shape::new(1, 32, 5, 5),
        a_c2_out,
        c2_out_q.0,
        c2_out_q.1,
    ));
    let t_c2_flat = g.push_tensor(TensorDesc::activation(
        "conv2d_2_output0",
        Shape::vector(800),
        a_c2_out,
        c2_out_q.0,
        c2_out_q.1,
    ));
    let t_c2_s0 = g.push_tensor(TensorDesc::plain("conv2d_2_scratch0", Shape::vector(6_144), a_c2_s0));
    let t_c2_s1 = g.push_tensor(TensorDesc::activation(
        "conv2d_2_scratch1",
        Shape::new(1, 32, 2, 11),
        a_c2_s1,
        c2_out_q.0,
        c2_out_q.1,
    ));
    let t_c2_w = g.push_tensor(weights("conv2d_2_weights", Shape::new(32, 16, 3, 3), a_c2_w, &CONV2D_2_W_SCALES));

    let t_g5_b = g.push_tensor(TensorDesc::plain("gemm_5_bias", Shape::vector(128), a_g5_b));
    let t_g5_out = g.push_tensor(TensorDesc::activation(
        "gemm_5_output",
        Shape::vector(128),
        a_g5_out,
        0.011_320_102_028_548_717,
        -128,
    ));
    let t_g5_s0 = g.push_tensor(TensorDesc::plain("gemm_5_scratch0", Shape::vector(1_440), a_g5_s0));
    let t_g5_w = g.push_tensor(weights("gemm_5_weights", Shape::new(128, 800, 1, 1), a_g5_w, &GEMM_5_W_SCALES));

    let t_g6_b = g.push_tensor(TensorDesc::plain("gemm_6_bias", Shape::vector(10), a_g6_b));
    let t_g6_out = g.push_tensor(TensorDesc::activation(
        "gemm_6_output",
        Shape::vector(10),
        a_g6_out,
        0.210_902_377_963_066_1,
        44,
    ));
    let t_g6_s0 = g.push_tensor(TensorDesc::plain("gemm_6_scratch0", Shape::vector(178), a_g6_s0));
    let t_g6_w = g.push_tensor(weights("gemm_6_weights", Shape::new(10, 128, 1, 1), a_g6_w, &GEMM_6_W_SCALES));

    let t_nl_out = g.push_tensor(TensorDesc::activation(
        "nl_7_output",
        Shape::vector(10),
        a_nl_out,
        0.003_906_25,
        -128,
    ));
    let t_nl_s0 = g.push_tensor(TensorDesc::plain("nl_7_scratch0", Shape::vector(124), a_nl_s0));
    let t_in = g.push_tensor(TensorDesc::activation(
        "serving_default_keras_tensor0_output",
        Shape::new(1, 1, 28, 28),
        a_in,
        0.003_921_568_859_368_563,
        -128,
    ));

    // ── Layer chain ────────────────────────────────────────────────

    let conv = LayerOp::ConvPool(ConvPoolConfig::default().with_pool(2, 2));
    g.push_node(LayerNode {
        id: 1,
        name: "conv2d_0".into(),
        op: conv,
        inputs: vec![t_in],
        outputs: vec![t_c0_out],
        params: vec![t_c0_w, t_c0_b],
        scratch: vec![t_c0_s0, t_c0_s1],
        next: 1,
    });
    g.push_node(LayerNode {
        id: 3,
        name: "conv2d_2".into(),
        op: conv,
        inputs: vec![t_c0_out],
        outputs: vec![t_c2_out],
        params: vec![t_c2_w, t_c2_b],
        scratch: vec![t_c2_s0, t_c2_s1],
        next: 2,
    });
    g.push_node(LayerNode {
        id: 5,
        name: "gemm_5".into(),
        op: LayerOp::Dense,
        inputs: vec![t_c2_flat],
        outputs: vec![t_g5_out],
        params: vec![t_g5_w, t_g5_b],
        scratch: vec![t_g5_s0],
        next: 3,
    });
    g.push_node(LayerNode {
        id: 6,
        name: "gemm_6".into(),
        op: LayerOp::Dense,
        inputs: vec![t_g5_out],
        outputs: vec![t_g6_out],
        params: vec![t_g6_w, t_g6_b],
        scratch: vec![t_g6_s0],
        next: 4,
    });
    g.push_node(LayerNode {
        id: 7,
        name: "nl_7".into(),
        op: LayerOp::Softmax(SoftmaxConfig {
            axis: Axis::Channel,
            nl_params: [1_811_637_632, 24, -124],
        }),
        inputs: vec![t_g6_out],
        outputs: vec![t_nl_out],
        params: vec![],
        scratch: vec![t_nl_s0],
        next: 4,
    });

    g.root = 0;
    g.inputs = vec![t_in];
    g.outputs = vec![t_nl_out];
    g
}

/// Symmetric int8 weights quantized per output channel.
fn weights(name: &str, shape: Shape, array: ArrayId, scales: &[f32]) -> TensorDesc {
    TensorDesc::with_quant(name, shape, array, QuantParams::per_channel(scales, 0), Axis::Batch)
}

// ── Quantization tables ────────────────────────────────────────────

const CONV2D_0_W_SCALES: [f32; 16] = [
    0.004230286460369825, 0.005449645221233368, 0.005801447667181492, 0.0022801668383181095,
    0.007907293736934662, 0.007112881168723106, 3.937008052901092e-09, 0.005930761341005564,
    0.007352868560701609, 0.0061614313162863255, 0.004783686716109514, 0.007339878473430872,
    2.0536996103714955e-08, 0.007041849195957184, 0.004579009488224983, 1.9778880755438877e-08,
];

const CONV2D_2_W_SCALES: [f32; 32] = [
    0.0024633524008095264, 1.8937488022174875e-08, 0.0035188987385481596, 0.002888962160795927,
    0.0019109672866761684, 0.0025813141837716103, 0.003225265070796013, 0.0037019962910562754,
    2.5247736346045713e-08, 0.0026493913028389215, 0.0028385433834046125, 0.0032388579566031694,
    0.0028988446574658155, 0.0035428733099251986, 0.002972556510940194, 1.0605831768373264e-08,
    0.002831145189702511, 0.0037347411271184683, 0.002238908316940069, 0.00400411244481802,
    0.0032493274193257093, 0.0035853595472872257, 0.003228536807000637, 0.0029454028699547052,
    0.0028141778893768787, 0.002747975056990981, 0.004227847326546907, 0.00252998573705554,
    0.0024785215500742197, 0.002723842626437545, 0.0037702787667512894, 0.0031665435526520014,
];

const GEMM_5_W_SCALES: [f32; 128] = [
    0.0011772534344345331, 3.937008052901092e-09, 0.0011590354843065143, 0.0012253941968083382,
    3.937008052901092e-09, 0.0011826870031654835, 0.0011038325028494, 0.0009471026132814586,
    3.937008052901092e-09, 3.937008052901092e-09, 3.937008052901092e-09, 0.0009194655576720834,
    0.0010579368099570274, 0.0010786441853269935, 0.0011786994291469455, 3.937008052901092e-09,
    3.937008052901092e-09, 0.0010763461468741298, 0.001051668543368578, 3.937008052901092e-09,
    0.0011707902885973454, 0.0010091197909787297, 0.0010247733443975449, 0.0010342240566387773,
    0.0013443328207358718, 0.0011697917943820357, 0.0016170251183211803, 0.0011068127350881696,
    0.0012035408290103078, 0.0012687990674749017, 0.0012933918042108417, 3.937008052901092e-09,
    0.0012702536769211292, 3.937008052901092e-09, 0.0010677995160222054, 0.0014598144916817546,
    0.001030333456583321, 0.0010666224407032132, 0.0011787586845457554, 0.0011108742328360677,
    3.937008052901092e-09, 0.0013316812692210078, 0.0011839058715850115, 0.0011582727311179042,
    3.937008052901092e-09, 0.001183997723273933, 3.937008052901092e-09, 0.0014007255667820573,
    0.0012689315481111407, 0.001157976919785142, 0.0009359184186905622, 0.0012936188140884042,
    0.0013921501813456416, 3.937008052901092e-09, 3.937008052901092e-09, 0.0013187422882765532,
    0.001557212439365685, 0.0012912005186080933, 0.0010561988456174731, 3.937008052901092e-09,
    0.001069514430128038, 0.0010968712158501148, 0.0011355753522366285, 0.0013138408539816737,
    0.0014652837999165058, 0.0011323641519993544, 0.0011528695467859507, 3.937008052901092e-09,
    0.0015366858569905162, 0.0010501997312530875, 0.0009684668038971722, 3.937008052901092e-09,
    0.0014517783420160413, 0.0012258882634341717, 3.937008052901092e-09, 0.0018483060412108898,
    0.001125640352256596, 0.0009963420452550054, 0.0011517549864947796, 0.0010109025752171874,
    0.001335685490630567, 0.0011688423110172153, 0.0008744889637455344, 3.937008052901092e-09,
    0.0011152428342029452, 0.0010973515454679728, 0.001512697315774858, 0.0011134344385936856,
    3.937008052901092e-09, 0.0013014377327635884, 0.0009326034924015403, 0.0010350409429520369,
    0.0011517751263454556, 0.0010955092730000615, 0.0012897374108433723, 0.000997165567241609,
    0.0012756659416481853, 0.0009627902181819081, 0.0010461570927873254, 0.001076422748155892,
    0.0011156471446156502, 0.0009095367859117687, 0.0009779935935512185, 3.937008052901092e-09,
    3.937008052901092e-09, 0.0011753838043659925, 0.0015739105874672532, 3.937008052901092e-09,
    0.000942989659961313, 3.937008052901092e-09, 3.937008052901092e-09, 0.0013746528420597315,
    0.0010998351499438286, 0.0012904424220323563, 0.0014933961210772395, 0.0010313690872862935,
    0.001251748763024807, 0.0011326706735417247, 0.0012570311082527041, 0.0010557961650192738,
    0.001239055534824729, 0.0012124675558879972, 0.0010614661732688546, 0.0010022984351962805,
    0.001053192769177258, 0.0010521457297727466, 0.0014452447649091482, 0.0010140014346688986,
];

const GEMM_6_W_SCALES: [f32; 10] = [
    0.019136246293783188, 0.016926901414990425, 0.011878443881869316, 0.012232976965606213,
    0.013941760174930096, 0.01152920164167881, 0.018179534003138542, 0.016979079693555832,
    0.01164179015904665, 0.012496599927544594,
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Kernel;
    use arena_mapper::ArenaKind;

    #[test]
    fn test_tables_match_compiler() {
        let g = digit_classifier();
        assert_eq!(g.arrays.len(), 21);
        assert_eq!(g.tensors.len(), 22);
        assert_eq!(g.nodes.len(), 5);
        assert_eq!(g.tensors[1].name, "conv2d_0_output");
        assert_eq!(g.tensors[21].name, "serving_default_keras_tensor0_output");
        assert_eq!(g.tensors[7].array, g.tensors[6].array);
    }

    #[test]
    fn test_validates() {
        let g = digit_classifier().validate().unwrap();
        let names: Vec<_> = g.chain().map(|(_, n)| n.name.as_str()).collect();
        assert_eq!(names, ["conv2d_0", "conv2d_2", "gemm_5", "gemm_6", "nl_7"]);
        assert_eq!(g.weight_bytes(), WEIGHTS_BYTES);
        assert!(matches!(g.kernel(4), Kernel::Softmax(k) if k.row_len == 10));
    }

    #[test]
    fn test_arrays_fill_arenas_exactly() {
        let g = digit_classifier();
        let end = |kind| g.arrays_in(kind).map(|(_, a)| a.end()).max().unwrap_or(0);
        assert_eq!(end(ArenaKind::Weights), WEIGHTS_BYTES);
        assert_eq!(end(ArenaKind::Activations), ACTIVATIONS_BYTES);
    }

    #[test]
    fn test_macc_close_to_declared() {
        let g = digit_classifier().validate().unwrap();
        let conv = 26 * 26 * 144 + 11 * 11 * 4_608;
        let dense = 800 * 128 + 128 * 10;
        assert_eq!(g.estimated_macc(), (conv + dense + 10) as u64);
        assert!(g.estimated_macc() <= g.info.n_macc);
    }
}
