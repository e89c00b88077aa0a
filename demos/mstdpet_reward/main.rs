use rand::{rngs::StdRng, Rng, SeedableRng};
extern crate spiking_learning_rules;
use spiking_learning_rules::{
    distribution::random_weights,
    error::LearningRuleError,
    layer::{ConnectionState, LayerRecord, NeuronState, StateDict},
    learning::{LearningRule, mstdpet::{MSTDPET, MSTDPETParameters}},
    tensor::SharedTensor,
};


/// Spikes and traces of a fully connected layer that the demo writes into every timestep
struct ToyLayer {
    pre_spikes: SharedTensor<bool>,
    pre_trace: SharedTensor<f32>,
    post_spikes: SharedTensor<bool>,
    post_trace: SharedTensor<f32>,
    weight: SharedTensor<f32>,
    trace_decay: f32,
}

impl ToyLayer {
    fn new<R: Rng>(rng: &mut R, batch_size: usize, post: usize, pre: usize) -> Result<Self, LearningRuleError> {
        Ok(
            ToyLayer {
                pre_spikes: SharedTensor::silent(&[batch_size, post, pre]),
                pre_trace: SharedTensor::zeros(&[batch_size, post, pre]),
                post_spikes: SharedTensor::silent(&[batch_size, post]),
                post_trace: SharedTensor::zeros(&[batch_size, post]),
                weight: SharedTensor::new(random_weights(rng, &[post, pre], 0.5, 0.1, 0., 1.)?),
                trace_decay: 0.8,
            }
        )
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

    /// Presynaptic neuron `j` fires with the given probability, postsynaptic neuron `i`
    /// fires one timestep after presynaptic neuron `i` fired
    fn iterate<R: Rng>(&self, rng: &mut R, firing_chance: f32) -> Result<(), LearningRuleError> {
        let shape = self.pre_spikes.shape()?;
        let (batch_size, post, pre) = (shape[0], shape[1], shape[2]);

        let mut pre_spikes = self.pre_spikes.write()?;
        let mut post_spikes = self.post_spikes.write()?;

        for sample in 0..batch_size {
            for i in 0..post {
                post_spikes[[sample, i]] = i < pre && pre_spikes[[sample, i, i]];
            }
            let fired: Vec<bool> = (0..pre).map(|_| rng.gen::<f32>() < firing_chance).collect();
            for i in 0..post {
                for j in 0..pre {
                    pre_spikes[[sample, i, j]] = fired[j];
                }
            }
        }

        let decay = self.trace_decay;
        let mut pre_trace = self.pre_trace.write()?;
        pre_trace.zip_mut_with(&*pre_spikes, |t, s| *t = decay * *t + if *s { 1. } else { 0. });
        let mut post_trace = self.post_trace.write()?;
        post_trace.zip_mut_with(&*post_spikes, |t, s| *t = decay * *t + if *s { 1. } else { 0. });

        Ok(())
    }
}

// - Generates a small fully connected layer with randomly initialized weights
// - Drives presynaptic neurons randomly, postsynaptic neuron `i` follows presynaptic neuron `i`
// - Accumulates an eligibility trace every timestep and rewards the layer every episode
// - Prints the weights after each episode, the diagonal should grow relative to the rest
fn main() -> Result<(), LearningRuleError> {
    tracing_subscriber::fmt::init();

    let mut rng = StdRng::seed_from_u64(42);

    let (batch_size, post, pre) = (4, 3, 3);
    let episodes = 10;
    let timesteps = 50;

    let layer = ToyLayer::new(&mut rng, batch_size, post, pre)?;
    let layers = StateDict::ordered().with("fc1", layer.record());

    let params = MSTDPETParameters { lr: 0.01, ..MSTDPETParameters::default() };
    let mut rule = MSTDPET::new(&layers, params)?;

    println!("initial weights:\n{}", layer.weight.read()?);

    for episode in 0..episodes {
        rule.reset_state()?;

        for _ in 0..timesteps {
            layer.iterate(&mut rng, 0.2)?;
            rule.update_state()?;
        }

        rule.step(1.)?;

        println!("episode {} weights:\n{}", episode, layer.weight.read()?);
    }

    Ok(())
}
