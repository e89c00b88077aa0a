#[cfg(test)]
mod tests {
    use ndarray::{ArrayD, IxDyn};
    use spiking_learning_rules::{
        error::{LearningRuleError, TensorError},
        layer::{ConnectionState, LayerRecord, NeuronState, StateDict},
        learning::{LearningRule, mstdpet::{MSTDPET, MSTDPETParameters}},
        tensor::SharedTensor,
    };


    const TOLERANCE: f32 = 1e-6;

    /// Handles to the state of a single layer so tests can act as the network
    struct LayerHandles {
        pre_spikes: SharedTensor<bool>,
        pre_trace: SharedTensor<f32>,
        post_spikes: SharedTensor<bool>,
        post_trace: SharedTensor<f32>,
        weight: SharedTensor<f32>,
    }

    impl LayerHandles {
        fn new(batch_size: usize, post: usize, pre: usize) -> Self {
            LayerHandles {
                pre_spikes: SharedTensor::silent(&[batch_size, post, pre]),
                pre_trace: SharedTensor::zeros(&[batch_size, post, pre]),
                post_spikes: SharedTensor::silent(&[batch_size, post]),
                post_trace: SharedTensor::zeros(&[batch_size, post]),
                weight: SharedTensor::zeros(&[post, pre]),
            }
        }

        fn record(&self) -> LayerRecord {
            LayerRecord::new(
                ConnectionState {
                    spikes: self.pre_spikes.clone(),
                    trace: self.pre_trace.clone(),
                    weight: self.weight.clone(),
                },
                NeuronState {
                    spikes: self.post_spikes.clone(),
                    trace: self.post_trace.clone(),
                },
            )
        }

        fn set(&self, pre_spikes: &[bool], pre_trace: &[f32], post_spikes: &[bool], post_trace: &[f32]) {
            assign(&self.pre_spikes, pre_spikes);
            assign(&self.pre_trace, pre_trace);
            assign(&self.post_spikes, post_spikes);
            assign(&self.post_trace, post_trace);
        }
    }

    fn assign<A: Copy>(tensor: &SharedTensor<A>, values: &[A]) {
        let mut array = tensor.write().unwrap();
        for (current, new) in array.iter_mut().zip(values.iter()) {
            *current = *new;
        }
    }

    fn single_layer(handles: &LayerHandles) -> StateDict {
        StateDict::ordered().with("fc1", handles.record())
    }

    fn params(lr: f32, e_trace_decay: f32) -> MSTDPETParameters {
        MSTDPETParameters { lr, e_trace_decay, ..MSTDPETParameters::default() }
    }

    #[test]
    pub fn test_default_parameters() {
        let params = MSTDPETParameters::default();

        assert_eq!(params.a_pre, 1.);
        assert_eq!(params.a_post, 1.);
        assert_eq!(params.lr, 0.0001);
        assert!((params.e_trace_decay - 0.951229).abs() < TOLERANCE);
    }

    #[test]
    pub fn test_e_trace_starts_at_zero() -> Result<(), LearningRuleError> {
        let handles = LayerHandles::new(3, 2, 4);
        let rule = MSTDPET::new(&single_layer(&handles), MSTDPETParameters::default())?;

        let e_trace = rule.e_trace("fc1").unwrap();
        assert_eq!(e_trace, &ArrayD::<f32>::zeros(IxDyn(&[3, 2, 4])));

        Ok(())
    }

    #[test]
    pub fn test_reference_scenario() -> Result<(), LearningRuleError> {
        // batch of two, single synapse
        let handles = LayerHandles::new(2, 1, 1);
        assign(&handles.weight, &[0.5]);
        handles.set(&[true, false], &[0.5, 0.5], &[false, true], &[0.3, 0.3]);

        let mut rule = MSTDPET::new(&single_layer(&handles), params(0.01, 1.))?;

        rule.update_state()?;

        let e_trace = rule.e_trace("fc1").unwrap();
        assert!((e_trace[[0, 0, 0]] - -0.3).abs() < TOLERANCE);
        assert!((e_trace[[1, 0, 0]] - 0.5).abs() < TOLERANCE);

        rule.step(2.)?;

        // 0.01 * 2 * mean([-0.3, 0.5])
        assert!((handles.weight.read()?[[0, 0]] - 0.502).abs() < TOLERANCE);

        Ok(())
    }

    #[test]
    pub fn test_silent_network_keeps_zero_trace() -> Result<(), LearningRuleError> {
        let handles = LayerHandles::new(2, 3, 3);
        let mut rule = MSTDPET::new(&single_layer(&handles), MSTDPETParameters::default())?;

        for _ in 0..50 {
            rule.update_state()?;
        }

        assert!(rule.e_trace("fc1").unwrap().iter().all(|i| *i == 0.));

        Ok(())
    }

    #[test]
    pub fn test_impulse_decays_geometrically() -> Result<(), LearningRuleError> {
        let decay = 0.8;
        let handles = LayerHandles::new(1, 1, 1);
        handles.set(&[false], &[0.5], &[true], &[0.]);

        let mut rule = MSTDPET::new(&single_layer(&handles), params(0.01, decay))?;
        rule.update_state()?;

        handles.set(&[false], &[0.], &[false], &[0.]);

        let impulse = 0.5;
        for k in 1..20 {
            rule.update_state()?;

            let expected = impulse * decay.powi(k);
            let actual = rule.e_trace("fc1").unwrap()[[0, 0, 0]];
            assert!((actual - expected).abs() < TOLERANCE, "k: {}, actual: {}, expected: {}", k, actual, expected);
        }

        Ok(())
    }

    #[test]
    pub fn test_postsynaptic_state_broadcasts_over_presynaptic_axis() -> Result<(), LearningRuleError> {
        let handles = LayerHandles::new(1, 2, 3);
        // synapse (post, pre) is indexed as post * 3 + pre
        handles.set(
            &[false, true, false, false, false, true],
            &[0.1, 0.2, 0.3, 0.4, 0.5, 0.6],
            &[true, false],
            &[0.7, 0.9],
        );

        let mut rule = MSTDPET::new(&single_layer(&handles), params(0.01, 1.))?;
        rule.update_state()?;

        let e_trace = rule.e_trace("fc1").unwrap();
        let expected = [
            [0.1, 0.2 - 0.7, 0.3],
            [0., 0., -0.9],
        ];
        for post in 0..2 {
            for pre in 0..3 {
                assert!(
                    (e_trace[[0, post, pre]] - expected[post][pre]).abs() < TOLERANCE,
                    "post: {}, pre: {}, actual: {}", post, pre, e_trace[[0, post, pre]],
                );
            }
        }

        Ok(())
    }

    #[test]
    pub fn test_reset_state_zeros_trace_only() -> Result<(), LearningRuleError> {
        let handles = LayerHandles::new(2, 1, 2);
        assign(&handles.weight, &[0.25, 0.75]);
        handles.set(&[true, true, false, false], &[1., 1., 1., 1.], &[true, true], &[0.5, 0.5]);

        let mut rule = MSTDPET::new(&single_layer(&handles), MSTDPETParameters::default())?;
        rule.update_state()?;
        assert!(rule.e_trace("fc1").unwrap().iter().any(|i| *i != 0.));

        rule.reset_state()?;

        assert_eq!(rule.e_trace("fc1").unwrap(), &ArrayD::<f32>::zeros(IxDyn(&[2, 1, 2])));
        assert_eq!(handles.weight.to_owned_array()?.into_raw_vec(), vec![0.25, 0.75]);

        Ok(())
    }

    #[test]
    pub fn test_zero_reward_leaves_weights_unchanged() -> Result<(), LearningRuleError> {
        let handles = LayerHandles::new(2, 1, 2);
        assign(&handles.weight, &[0.25, 0.75]);
        handles.set(&[true, false, false, true], &[0.4, 0.3, 0.2, 0.1], &[true, false], &[0.6, 0.8]);

        let mut rule = MSTDPET::new(&single_layer(&handles), params(0.5, 1.))?;
        rule.update_state()?;

        let e_trace = rule.e_trace("fc1").unwrap().clone();

        rule.step(0.)?;

        assert_eq!(handles.weight.to_owned_array()?.into_raw_vec(), vec![0.25, 0.75]);
        // stepping does not consume the eligibility trace
        assert_eq!(rule.e_trace("fc1").unwrap(), &e_trace);

        Ok(())
    }

    #[test]
    pub fn test_step_scales_mean_trace() -> Result<(), LearningRuleError> {
        let lr = 0.05;
        let reward = -1.5;

        let handles = LayerHandles::new(2, 1, 2);
        handles.set(&[true, false, false, true], &[0.4, 0.3, 0.2, 0.1], &[true, false], &[0.6, 0.8]);

        let mut rule = MSTDPET::new(&single_layer(&handles), params(lr, 0.9))?;
        rule.update_state()?;
        rule.update_state()?;

        let e_trace = rule.e_trace("fc1").unwrap().clone();
        let before = handles.weight.to_owned_array()?;

        rule.step(reward)?;

        let after = handles.weight.to_owned_array()?;
        for pre in 0..2 {
            let mean = (e_trace[[0, 0, pre]] + e_trace[[1, 0, pre]]) / 2.;
            let expected = before[[0, pre]] + lr * reward * mean;

            assert!((after[[0, pre]] - expected).abs() < TOLERANCE);
        }

        Ok(())
    }

    #[test]
    pub fn test_layers_are_updated_independently() -> Result<(), LearningRuleError> {
        let first = LayerHandles::new(1, 1, 1);
        let second = LayerHandles::new(1, 1, 1);
        first.set(&[false], &[1.], &[true], &[0.]);
        second.set(&[true], &[0.], &[false], &[1.]);

        let layers = StateDict::ordered()
            .with("first", first.record())
            .with("second", second.record());

        let mut rule = MSTDPET::new(&layers, params(0.1, 1.))?;
        rule.update_state()?;
        rule.step(1.)?;

        assert!((first.weight.read()?[[0, 0]] - 0.1).abs() < TOLERANCE);
        assert!((second.weight.read()?[[0, 0]] - -0.1).abs() < TOLERANCE);

        Ok(())
    }

    #[test]
    pub fn test_borrowed_weight_applies_no_update() -> Result<(), LearningRuleError> {
        let first = LayerHandles::new(1, 1, 1);
        let second = LayerHandles::new(1, 1, 1);
        first.set(&[false], &[1.], &[true], &[0.]);
        second.set(&[false], &[1.], &[true], &[0.]);

        let layers = StateDict::ordered()
            .with("first", first.record())
            .with("second", second.record());

        let mut rule = MSTDPET::new(&layers, params(0.1, 1.))?;
        rule.update_state()?;

        {
            let _guard = second.weight.read()?;

            assert_eq!(
                rule.step(1.),
                Err(LearningRuleError::TensorRelatedError(TensorError::TensorBorrowed)),
            );
        }

        assert_eq!(first.weight.read()?[[0, 0]], 0.);

        rule.step(1.)?;
        assert!((first.weight.read()?[[0, 0]] - 0.1).abs() < TOLERANCE);
        assert!((second.weight.read()?[[0, 0]] - 0.1).abs() < TOLERANCE);

        Ok(())
    }

    #[test]
    pub fn test_float_spikes_match_binary_spikes() -> Result<(), LearningRuleError> {
        let handles = LayerHandles::new(2, 2, 2);
        let pre_spikes = [true, false, false, true, true, true, false, false];
        let post_spikes = [false, true, true, false];
        handles.set(
            &pre_spikes,
            &[0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8],
            &post_spikes,
            &[0.9, 0.3, 0.6, 0.2],
        );

        let as_float = |spikes: &[bool], shape: &[usize]| SharedTensor::from_shape_vec(
            shape,
            spikes.iter().map(|s| if *s { 1_f32 } else { 0. }).collect(),
        );

        let connection = StateDict::ordered()
            .with("spikes", as_float(&pre_spikes, &[2, 2, 2])?)
            .with("trace", handles.pre_trace.clone())
            .with("weight", SharedTensor::zeros(&[2, 2]));
        let neuron = StateDict::ordered()
            .with("spikes", as_float(&post_spikes, &[2, 2])?)
            .with("trace", handles.post_trace.clone());
        let float_layers = StateDict::ordered().with(
            "fc1",
            StateDict::ordered().with("connection", connection).with("neuron", neuron),
        );

        let mut binary_rule = MSTDPET::new(&single_layer(&handles), params(0.01, 0.9))?;
        let mut float_rule = MSTDPET::new(&float_layers, params(0.01, 0.9))?;

        for _ in 0..3 {
            binary_rule.update_state()?;
            float_rule.update_state()?;
        }

        let binary_trace = binary_rule.e_trace("fc1").unwrap();
        let float_trace = float_rule.e_trace("fc1").unwrap();
        assert!(binary_trace.iter().any(|i| *i != 0.));
        for (binary, float) in binary_trace.iter().zip(float_trace.iter()) {
            assert!((binary - float).abs() < TOLERANCE);
        }

        Ok(())
    }

    #[test]
    pub fn test_failed_update_leaves_every_trace_unchanged() -> Result<(), LearningRuleError> {
        let first = LayerHandles::new(1, 1, 1);
        let second = LayerHandles::new(1, 1, 1);
        first.set(&[false], &[1.], &[true], &[0.]);

        let layers = StateDict::ordered()
            .with("first", first.record())
            .with("second", second.record());

        let mut rule = MSTDPET::new(&layers, params(0.1, 1.))?;

        *second.post_trace.write()? = ArrayD::zeros(IxDyn(&[1, 3]));

        assert!(matches!(
            rule.update_state(),
            Err(LearningRuleError::TensorRelatedError(TensorError::IncompatibleBroadcast { .. })),
        ));
        assert!(rule.e_trace("first").unwrap().iter().all(|i| *i == 0.));

        *second.post_trace.write()? = ArrayD::zeros(IxDyn(&[1, 1]));
        rule.update_state()?;

        assert!((rule.e_trace("first").unwrap()[[0, 0, 0]] - 1.).abs() < TOLERANCE);

        Ok(())
    }

    #[test]
    pub fn test_mismatched_shapes_are_reported() -> Result<(), LearningRuleError> {
        let handles = LayerHandles::new(2, 2, 3);
        let mut rule = MSTDPET::new(&single_layer(&handles), MSTDPETParameters::default())?;

        // network swaps in a neuron state that no longer lines up with the connection
        *handles.post_spikes.write()? = ArrayD::from_elem(IxDyn(&[2, 3]), true);

        assert!(matches!(
            rule.update_state(),
            Err(LearningRuleError::TensorRelatedError(TensorError::IncompatibleBroadcast { .. })),
        ));

        *handles.post_spikes.write()? = ArrayD::from_elem(IxDyn(&[2, 2]), false);
        *handles.weight.write()? = ArrayD::zeros(IxDyn(&[3, 2]));

        assert_eq!(
            rule.step(1.),
            Err(LearningRuleError::TensorRelatedError(TensorError::ShapeMismatch {
                expected: vec![3, 2],
                found: vec![2, 3],
            })),
        );

        Ok(())
    }
}
