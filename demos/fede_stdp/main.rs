use rand::{rngs::StdRng, Rng, SeedableRng};
extern crate spiking_learning_rules;
use spiking_learning_rules::{
    distribution::random_weights,
    error::LearningRuleError,
    layer::{ConnectionState, LayerRecord, NeuronState, StateDict},
    learning::{LearningRule, fede_stdp::{FedeSTDP, FedeSTDPParameters}},
    tensor::SharedTensor,
};


/// Decays the presynaptic trace and adds the spikes drawn for this timestep, presynaptic
/// neuron `j` fires with the chance given at index `j`
fn iterate_trace<R: Rng>(
    rng: &mut R,
    spikes: &SharedTensor<bool>,
    trace: &SharedTensor<f32>,
    firing_chances: &[f32],
    decay: f32,
) -> Result<(), LearningRuleError> {
    let mut spikes = spikes.write()?;
    for (index, spike) in spikes.indexed_iter_mut() {
        *spike = rng.gen::<f32>() < firing_chances[index[2]];
    }

    trace.write()?.zip_mut_with(&*spikes, |t, s| *t = decay * *t + if *s { 1. } else { 0. });

    Ok(())
}

// - Generates a layer with randomly initialized weights fed by presynaptic neurons
//   with increasing firing rates
// - Updates weights every timestep with the normalized trace
// - Prints the weights over time, frequently firing inputs settle above `w_init`
//   and rarely firing inputs settle below it
fn main() -> Result<(), LearningRuleError> {
    tracing_subscriber::fmt::init();

    let mut rng = StdRng::seed_from_u64(7);

    let (batch_size, post, pre) = (8, 2, 4);
    let firing_chances = [0.05, 0.1, 0.2, 0.4];
    let iterations = 200;

    let pre_spikes = SharedTensor::silent(&[batch_size, post, pre]);
    let pre_trace = SharedTensor::zeros(&[batch_size, post, pre]);
    let weight = SharedTensor::new(random_weights(&mut rng, &[post, pre], 0.5, 0.05, 0., 1.)?);

    let layers = StateDict::ordered().with(
        "fc1",
        LayerRecord::new(
            ConnectionState {
                spikes: pre_spikes.clone(),
                trace: pre_trace.clone(),
                weight: weight.clone(),
            },
            NeuronState {
                spikes: SharedTensor::silent(&[batch_size, post]),
                trace: SharedTensor::zeros(&[batch_size, post]),
            },
        ),
    );

    let mut rule = FedeSTDP::new(&layers, FedeSTDPParameters::new(0.001, 0.5, 0.5))?;

    println!("initial weights:\n{}", weight.read()?);

    for timestep in 0..iterations {
        iterate_trace(&mut rng, &pre_spikes, &pre_trace, &firing_chances, 0.9)?;

        rule.update_state()?;
        rule.step(())?;

        if (timestep + 1) % 50 == 0 {
            println!("timestep {} weights:\n{}", timestep + 1, weight.read()?);
        }
    }

    Ok(())
}
