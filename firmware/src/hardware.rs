//! Board bring-up and the peripheral binding of the control tick
//!
//! TIM1 drives the rectifier bridge, TIM8 the inverter bridge. ADC1 scans the
//! bank A inputs and ADC2 bank B. Gate driver enables are active low.

use cortex_m::peripheral::DWT;
use embassy_stm32::{
    adc::{Adc, AdcChannel, AnyAdcChannel, SampleTime},
    bind_interrupts, can,
    gpio::{Level, Output, OutputType, Speed},
    i2c::{self, I2c},
    mode::Blocking,
    peripherals,
    timer::{
        complementary_pwm::{ComplementaryPwm, ComplementaryPwmPin},
        low_level::CountingMode,
        simple_pwm::PwmPin,
        Channel,
    },
    Config, Peripherals,
};
use grid_converter::hardware::{ConverterHardware, Phase, PwmLeg, Stage};
use grid_converter::monitor::{DacWrite, MonitorDac};
use grid_converter::sampler::RawSamples;
use grid_converter::config::params::dac;

use crate::config;

bind_interrupts!(pub struct Irqs {
    FDCAN1_IT0 => can::IT0InterruptHandler<peripherals::FDCAN1>;
    FDCAN1_IT1 => can::IT1InterruptHandler<peripherals::FDCAN1>;
});

/// RCC clock configuration
///
/// HSI → PLL (÷4 × 85 ÷ 2) gives 170 MHz
pub fn create_clock_config() -> Config {
    let mut config = Config::default();
    {
        use embassy_stm32::rcc::mux::{Adcsel, ClockMux, Fdcansel};
        use embassy_stm32::rcc::{Pll, PllMul, PllPreDiv, PllRDiv, PllSource, Sysclk};

        config.rcc.hsi = true;
        config.rcc.pll = Some(Pll {
            source: PllSource::HSI,
            prediv: PllPreDiv::DIV4,
            mul: PllMul::MUL85,
            divp: None,
            divq: Some(embassy_stm32::rcc::PllQDiv::DIV2), // FDCAN clock
            divr: Some(PllRDiv::DIV2),
        });
        config.rcc.sys = Sysclk::PLL1_R;

        let mut clock_mux = ClockMux::default();
        clock_mux.adc12sel = Adcsel::SYS;
        clock_mux.fdcansel = Fdcansel::PLL1_Q;
        config.rcc.mux = clock_mux;
    }
    config
}

/// Start the DWT cycle counter used for tick timing
///
/// # Safety
/// Steals the core peripherals
pub unsafe fn enable_cycle_counter() {
    let mut cp = cortex_m::Peripherals::steal();
    cp.DCB.enable_trace();
    cp.DWT.enable_cycle_counter();
}

type AfePwm = ComplementaryPwm<'static, peripherals::TIM1>;
type InvPwm = ComplementaryPwm<'static, peripherals::TIM8>;

/// Everything the control tick touches
pub struct Board {
    rectifier_pwm: AfePwm,
    inverter_pwm: InvPwm,
    adc_a: Adc<'static, peripherals::ADC1>,
    adc_b: Adc<'static, peripherals::ADC2>,
    bank_a: [AnyAdcChannel<peripherals::ADC1>; 8],
    bank_b: [AnyAdcChannel<peripherals::ADC2>; 8],
    rectifier_gate_n: Output<'static>,
    inverter_gate_n: Output<'static>,
    timing_probe: Output<'static>,
    period: u16,
}

/// Peripherals left over for the background tasks
pub struct Background {
    pub can: can::CanConfigurator<'static>,
    pub i2c: I2c<'static, Blocking>,
}

const PHASE_CHANNELS: [Channel; 3] = [Channel::Ch1, Channel::Ch2, Channel::Ch3];

impl Board {
    /// Configure timers, ADCs and GPIO; both stages start with gates disabled
    pub fn init(p: Peripherals) -> (Self, Background) {
        info!("Initializing rectifier PWM (TIM1)...");
        let mut rectifier_pwm = ComplementaryPwm::new(
            p.TIM1,
            Some(PwmPin::new(p.PE9, OutputType::PushPull)),
            Some(ComplementaryPwmPin::new(p.PE8, OutputType::PushPull)),
            Some(PwmPin::new(p.PE11, OutputType::PushPull)),
            Some(ComplementaryPwmPin::new(p.PE10, OutputType::PushPull)),
            Some(PwmPin::new(p.PE13, OutputType::PushPull)),
            Some(ComplementaryPwmPin::new(p.PE12, OutputType::PushPull)),
            None,
            None,
            config::pwm::FREQUENCY,
            CountingMode::CenterAlignedBothInterrupts,
        );
        rectifier_pwm.set_dead_time(config::pwm::DEAD_TIME);

        info!("Initializing inverter PWM (TIM8)...");
        let mut inverter_pwm = ComplementaryPwm::new(
            p.TIM8,
            Some(PwmPin::new(p.PC6, OutputType::PushPull)),
            Some(ComplementaryPwmPin::new(p.PC10, OutputType::PushPull)),
            Some(PwmPin::new(p.PC7, OutputType::PushPull)),
            Some(ComplementaryPwmPin::new(p.PC11, OutputType::PushPull)),
            Some(PwmPin::new(p.PC8, OutputType::PushPull)),
            Some(ComplementaryPwmPin::new(p.PC12, OutputType::PushPull)),
            None,
            None,
            config::pwm::FREQUENCY,
            CountingMode::CenterAlignedBothInterrupts,
        );
        inverter_pwm.set_dead_time(config::pwm::DEAD_TIME);

        let period = rectifier_pwm.get_max_duty();
        let half = period / 2;
        for ch in PHASE_CHANNELS {
            rectifier_pwm.set_duty(ch, half);
            inverter_pwm.set_duty(ch, half);
            rectifier_pwm.enable(ch);
            inverter_pwm.enable(ch);
        }
        info!("PWM period: {} counts", period);

        let mut adc_a = Adc::new(p.ADC1);
        adc_a.set_sample_time(SampleTime::CYCLES2_5);
        let mut adc_b = Adc::new(p.ADC2);
        adc_b.set_sample_time(SampleTime::CYCLES2_5);

        // Bank order matches RawSamples: A0..A7, then B0..B7
        let bank_a = [
            p.PA0.degrade_adc(),
            p.PA1.degrade_adc(),
            p.PA2.degrade_adc(),
            p.PA3.degrade_adc(),
            p.PB14.degrade_adc(),
            p.PC0.degrade_adc(),
            p.PC1.degrade_adc(),
            p.PC2.degrade_adc(),
        ];
        let bank_b = [
            p.PA4.degrade_adc(),
            p.PA5.degrade_adc(),
            p.PA6.degrade_adc(),
            p.PA7.degrade_adc(),
            p.PC4.degrade_adc(),
            p.PC5.degrade_adc(),
            p.PB2.degrade_adc(),
            p.PB15.degrade_adc(),
        ];

        let board = Self {
            rectifier_pwm,
            inverter_pwm,
            adc_a,
            adc_b,
            bank_a,
            bank_b,
            rectifier_gate_n: Output::new(p.PD0, Level::High, Speed::Low),
            inverter_gate_n: Output::new(p.PD1, Level::High, Speed::Low),
            timing_probe: Output::new(p.PD10, Level::Low, Speed::VeryHigh),
            period,
        };

        let can = can::CanConfigurator::new(p.FDCAN1, p.PA11, p.PA12, Irqs);
        let i2c = I2c::new_blocking(
            p.I2C1,
            p.PB8,
            p.PB9,
            config::i2c::FREQUENCY,
            i2c::Config::default(),
        );

        (board, Background { can, i2c })
    }

    fn set_stage_duty(&mut self, stage: Stage, ch: Channel, count: u16) {
        match stage {
            Stage::Rectifier => self.rectifier_pwm.set_duty(ch, count),
            Stage::Inverter => self.inverter_pwm.set_duty(ch, count),
        }
    }
}

impl ConverterHardware for Board {
    fn sample_analog_inputs(&mut self) -> RawSamples {
        let mut raw = RawSamples::mid_scale();
        for (i, ch) in self.bank_a.iter_mut().enumerate() {
            raw.counts[i] = self.adc_a.blocking_read(ch);
        }
        for (i, ch) in self.bank_b.iter_mut().enumerate() {
            raw.counts[8 + i] = self.adc_b.blocking_read(ch);
        }
        raw
    }

    fn write_pwm_duty(&mut self, leg: PwmLeg, count: u16) {
        let ch = match leg.phase {
            Phase::A => Channel::Ch1,
            Phase::B => Channel::Ch2,
            Phase::C => Channel::Ch3,
        };
        self.set_stage_duty(leg.stage, ch, count.min(self.period));
    }

    fn pwm_period(&self) -> u16 {
        self.period
    }

    fn set_driver_enable(&mut self, stage: Stage, enabled: bool) {
        let pin = match stage {
            Stage::Rectifier => &mut self.rectifier_gate_n,
            Stage::Inverter => &mut self.inverter_gate_n,
        };
        // active low
        if enabled {
            pin.set_low();
        } else {
            pin.set_high();
        }
    }

    fn cycle_count(&self) -> u32 {
        DWT::cycle_count()
    }

    fn set_timing_probe(&mut self, high: bool) {
        if high {
            self.timing_probe.set_high();
        } else {
            self.timing_probe.set_low();
        }
    }
}

/// Quad DAC on I2C1
pub struct I2cDac {
    i2c: I2c<'static, Blocking>,
}

impl I2cDac {
    pub fn new(i2c: I2c<'static, Blocking>) -> Self {
        Self { i2c }
    }
}

impl MonitorDac for I2cDac {
    type Error = i2c::Error;

    fn write(&mut self, write: &DacWrite) -> Result<(), i2c::Error> {
        self.i2c.blocking_write(dac::I2C_ADDRESS, &write.bytes)
    }
}
