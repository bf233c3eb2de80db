use crate::about;
use crate::app::{GuiController, TicGui};
use crate::settings::{ControlMode, DecayMode, Settings, StepMode, INPUT_MAX_VALUE, MAX_ALLOWED_ACCEL, MAX_ALLOWED_SPEED};
use crate::state::State;
use crate::variables::error_names;
use crate::view::WindowModel;
use crate::{INITIAL_WIDTH, PROGRAM_TITLE};
use eframe::egui::{self, Color32, Context, ScrollArea, Ui};

const ERROR_COLOR: Color32 = Color32::from_rgb(255, 0, 0);
const STALE_COLOR: Color32 = Color32::GRAY;

// Things the user asked for while drawing; applied after the frame is laid out
enum UiAction {
    Connect(String),
    Disconnect,
    ReloadSettings,
    RestoreDefaults,
    ApplySettings,
    EditSettings(Settings),
    SetTargetPosition(i32),
    SetTargetVelocity(i32),
    About,
    Exit,
}

// --- UI Drawing Functions ---

pub(crate) fn draw_about_screen(app: &mut TicGui, ui: &mut Ui) {
    ui.set_width(INITIAL_WIDTH);
    ui.vertical_centered(|ui| {
        ui.heading(format!("About {}", PROGRAM_TITLE));
        ui.separator();
        for line in about::about() {
            ui.label(line);
        }
        ui.separator();
        if ui.button("OK").clicked() {
            app.state = State::Running;
        }
    });
}

pub(crate) fn draw_running_state(app: &mut TicGui, ui: &mut Ui, ctx: &Context) {
    let mut actions = Vec::new();

    {
        let view = app.controller.window_mut();
        draw_device_bar(view, ui, &mut actions);
        ui.separator();

        ui.columns(2, |columns| {
            ScrollArea::vertical()
                .id_salt("status_scroll")
                .auto_shrink([false, false])
                .show(&mut columns[0], |ui| {
                    draw_device_info(view, ui);
                    ui.separator();
                    draw_status_section(view, ui);
                    ui.separator();
                    draw_manual_target(view, ui, &mut actions);
                });

            ScrollArea::vertical()
                .id_salt("settings_scroll")
                .auto_shrink([false, false])
                .show(&mut columns[1], |ui| {
                    draw_settings_section(view, ui, &mut actions);
                });
        });
    }

    for action in actions {
        match action {
            UiAction::About => app.state = State::About,
            UiAction::Exit => ctx.send_viewport_cmd(egui::ViewportCommand::Close),
            other => dispatch(&mut app.controller, other),
        }
    }
}

fn dispatch(controller: &mut GuiController, action: UiAction) {
    match action {
        UiAction::Connect(os_id) => controller.connect_device_with_os_id(&os_id),
        UiAction::Disconnect => {
            controller.disconnect_device();
        }
        UiAction::ReloadSettings => controller.reload_settings(),
        UiAction::RestoreDefaults => controller.restore_default_settings(),
        UiAction::ApplySettings => controller.apply_settings(),
        UiAction::EditSettings(edited) => dispatch_settings_edits(controller, edited),
        UiAction::SetTargetPosition(position) => controller.set_target_position(position),
        UiAction::SetTargetVelocity(velocity) => controller.set_target_velocity(velocity),
        UiAction::About | UiAction::Exit => {}
    }
}

/// Forwards each field that differs from the controller's copy to its input handler.
fn dispatch_settings_edits(controller: &mut GuiController, edited: Settings) {
    let Some(current) = controller.settings().cloned() else {
        return;
    };
    if edited.control_mode != current.control_mode {
        controller.handle_control_mode_input(edited.control_mode);
    }
    if edited.input_min != current.input_min {
        controller.handle_input_min_input(edited.input_min);
    }
    if edited.input_neutral_min != current.input_neutral_min {
        controller.handle_input_neutral_min_input(edited.input_neutral_min);
    }
    if edited.input_neutral_max != current.input_neutral_max {
        controller.handle_input_neutral_max_input(edited.input_neutral_max);
    }
    if edited.input_max != current.input_max {
        controller.handle_input_max_input(edited.input_max);
    }
    if edited.output_min != current.output_min {
        controller.handle_output_min_input(edited.output_min);
    }
    if edited.output_max != current.output_max {
        controller.handle_output_max_input(edited.output_max);
    }
    if edited.speed_max != current.speed_max {
        controller.handle_speed_max_input(edited.speed_max);
    }
    if edited.speed_min != current.speed_min {
        controller.handle_speed_min_input(edited.speed_min);
    }
    if edited.accel_max != current.accel_max {
        controller.handle_accel_max_input(edited.accel_max);
    }
    if edited.decel_max != current.decel_max {
        controller.handle_decel_max_input(edited.decel_max);
    }
    if edited.step_mode != current.step_mode {
        controller.handle_step_mode_input(edited.step_mode);
    }
    if edited.current_limit != current.current_limit {
        controller.handle_current_limit_input(edited.current_limit);
    }
    if edited.decay_mode != current.decay_mode {
        controller.handle_decay_mode_input(edited.decay_mode);
    }
}

fn draw_device_bar(view: &WindowModel, ui: &mut Ui, actions: &mut Vec<UiAction>) {
    ui.horizontal(|ui| {
        ui.label("Device:");

        let selected_text = view
            .selected_os_id
            .as_deref()
            .and_then(|id| view.device_list.iter().find(|d| d.os_id == id))
            .map(|d| d.to_string())
            .unwrap_or_else(|| "Not connected".to_string());

        egui::ComboBox::from_id_salt("device_combo")
            .width(300.0)
            .selected_text(selected_text)
            .show_ui(ui, |ui| {
                for device in &view.device_list {
                    let is_selected = view.selected_os_id.as_deref() == Some(device.os_id.as_str());
                    if ui.selectable_label(is_selected, device.to_string()).clicked() && !is_selected {
                        actions.push(UiAction::Connect(device.os_id.clone()));
                    }
                }
            });

        if ui.add_enabled(view.connect_enabled, egui::Button::new("Connect")).clicked() {
            if let Some(first) = view.device_list.first() {
                actions.push(UiAction::Connect(first.os_id.clone()));
            }
        }
        if ui.add_enabled(view.disconnect_enabled, egui::Button::new("Disconnect")).clicked() {
            actions.push(UiAction::Disconnect);
        }
        if ui
            .add_enabled(view.reload_settings_enabled, egui::Button::new("Reload settings"))
            .clicked()
        {
            actions.push(UiAction::ReloadSettings);
        }
        if ui
            .add_enabled(view.restore_defaults_enabled, egui::Button::new("Restore defaults"))
            .clicked()
        {
            actions.push(UiAction::RestoreDefaults);
        }
        if ui.button("About").clicked() {
            actions.push(UiAction::About);
        }
        if ui.button("Exit").clicked() {
            actions.push(UiAction::Exit);
        }
    });

    if !view.connection_status.is_empty() {
        let color = if view.connection_status_is_error { ERROR_COLOR } else { Color32::GRAY };
        ui.colored_label(color, &view.connection_status);
    }
}

fn draw_device_info(view: &WindowModel, ui: &mut Ui) {
    ui.heading("Device info");
    egui::Grid::new("device_info_grid").num_columns(2).show(ui, |ui| {
        ui.label("Name:");
        if view.device_name_is_link {
            ui.hyperlink_to(&view.device_name, "https://www.pololu.com/tic");
        } else {
            ui.label(&view.device_name);
        }
        ui.end_row();
        ui.label("Serial number:");
        ui.label(&view.serial_number);
        ui.end_row();
        ui.label("Firmware version:");
        ui.label(&view.firmware_version);
        ui.end_row();
    });
}

fn draw_status_section(view: &WindowModel, ui: &mut Ui) {
    ui.heading("Status");
    if !view.tab_pages_enabled {
        ui.label("(Connect to a device to see its status)");
        return;
    }

    let vars = &view.variables;
    let value = |ui: &mut Ui, text: String| {
        if view.variables_stale {
            ui.colored_label(STALE_COLOR, text);
        } else {
            ui.label(text);
        }
    };

    egui::Grid::new("status_grid").num_columns(2).show(ui, |ui| {
        ui.label("Operation state:");
        value(ui, vars.operation_state.to_string());
        ui.end_row();
        ui.label("Energized:");
        value(ui, if vars.energized { "Yes" } else { "No" }.to_string());
        ui.end_row();
        ui.label("VIN voltage:");
        value(ui, format!("{:.1} V", vars.vin_voltage as f32 / 1000.0));
        ui.end_row();
        ui.label("Up time:");
        value(ui, vars.up_time_string());
        ui.end_row();
        ui.label("Target position:");
        value(ui, vars.target_position.to_string());
        ui.end_row();
        ui.label("Target velocity:");
        value(ui, vars.target_velocity.to_string());
        ui.end_row();
        ui.label("Current position:");
        value(ui, vars.current_position.to_string());
        ui.end_row();
        ui.label("Current velocity:");
        value(ui, vars.current_velocity.to_string());
        ui.end_row();
        ui.label("Position uncertain:");
        value(ui, if vars.position_uncertain { "Yes" } else { "No" }.to_string());
        ui.end_row();
        ui.label("Encoder position:");
        value(ui, vars.encoder_position.to_string());
        ui.end_row();
        ui.label("Input after scaling:");
        value(ui, vars.input_after_scaling.to_string());
        ui.end_row();
    });

    let active = error_names(vars.error_status as u32);
    ui.label("Errors stopping the motor:");
    if active.is_empty() {
        ui.label("   None");
    }
    for name in active {
        ui.colored_label(ERROR_COLOR, format!("   {}", name));
    }

    if view.variables_stale {
        ui.colored_label(STALE_COLOR, "(Status could not be read from the device)");
    }
}

fn draw_manual_target(view: &mut WindowModel, ui: &mut Ui, actions: &mut Vec<UiAction>) {
    ui.heading("Set target");
    ui.add_enabled_ui(view.manual_target_enabled, |ui| {
        ui.horizontal(|ui| {
            ui.add(egui::DragValue::new(&mut view.target_position));
            if ui.button("Set target position").clicked() {
                actions.push(UiAction::SetTargetPosition(view.target_position));
            }
        });
        ui.horizontal(|ui| {
            ui.add(egui::DragValue::new(&mut view.target_velocity));
            if ui.button("Set target velocity").clicked() {
                actions.push(UiAction::SetTargetVelocity(view.target_velocity));
            }
        });
    });
    if !view.manual_target_enabled && view.tab_pages_enabled {
        ui.label("(Manual targets need the Serial / I\u{b2}C / USB control mode)");
    }
}

fn draw_settings_section(view: &WindowModel, ui: &mut Ui, actions: &mut Vec<UiAction>) {
    ui.heading("Settings");
    let Some(settings) = view.settings.as_ref() else {
        ui.label("(Connect to a device to edit its settings)");
        return;
    };

    let mut edited = settings.clone();
    ui.add_enabled_ui(view.tab_pages_enabled, |ui| {
        egui::Grid::new("settings_grid").num_columns(2).show(ui, |ui| {
            ui.label("Control mode:");
            egui::ComboBox::from_id_salt("control_mode_combo")
                .selected_text(edited.control_mode.to_string())
                .show_ui(ui, |ui| {
                    for mode in ControlMode::ALL {
                        ui.selectable_value(&mut edited.control_mode, mode, mode.to_string());
                    }
                });
            ui.end_row();

            for (label, value) in [
                ("Input minimum:", &mut edited.input_min),
                ("Input neutral minimum:", &mut edited.input_neutral_min),
                ("Input neutral maximum:", &mut edited.input_neutral_max),
                ("Input maximum:", &mut edited.input_max),
            ] {
                ui.label(label);
                ui.add(egui::DragValue::new(value).range(0..=INPUT_MAX_VALUE));
                ui.end_row();
            }

            // The scaled input is a speed in the speed modes and a position otherwise
            let target = if edited.control_mode.is_speed_mode() { "Speed" } else { "Position" };
            ui.label(format!("{} minimum:", target));
            ui.add(egui::DragValue::new(&mut edited.output_min).range(i32::MIN..=0));
            ui.end_row();
            ui.label(format!("{} maximum:", target));
            ui.add(egui::DragValue::new(&mut edited.output_max).range(0..=i32::MAX));
            ui.end_row();

            ui.label("Max speed (steps/10000 s):");
            ui.add(egui::DragValue::new(&mut edited.speed_max).range(0..=MAX_ALLOWED_SPEED));
            ui.end_row();
            ui.label("Starting speed (steps/10000 s):");
            ui.add(egui::DragValue::new(&mut edited.speed_min).range(0..=MAX_ALLOWED_SPEED));
            ui.end_row();
            ui.label("Max acceleration (steps/s/100 s):");
            ui.add(egui::DragValue::new(&mut edited.accel_max).range(0..=MAX_ALLOWED_ACCEL));
            ui.end_row();
            ui.label("Max deceleration (0 = same):");
            ui.add(egui::DragValue::new(&mut edited.decel_max).range(0..=MAX_ALLOWED_ACCEL));
            ui.end_row();

            ui.label("Step mode:");
            egui::ComboBox::from_id_salt("step_mode_combo")
                .selected_text(edited.step_mode.to_string())
                .show_ui(ui, |ui| {
                    for mode in StepMode::ALL.into_iter().filter(|m| *m <= settings.product.max_step_mode()) {
                        ui.selectable_value(&mut edited.step_mode, mode, mode.to_string());
                    }
                });
            ui.end_row();

            ui.label("Current limit (mA):");
            ui.add(
                egui::DragValue::new(&mut edited.current_limit)
                    .range(0..=settings.product.max_current_limit())
                    .speed(8.0),
            );
            ui.end_row();

            ui.label("Decay mode:");
            egui::ComboBox::from_id_salt("decay_mode_combo")
                .selected_text(edited.decay_mode.to_string())
                .show_ui(ui, |ui| {
                    for mode in DecayMode::ALL
                        .into_iter()
                        .filter(|m| settings.product.supports_decay_mode(*m))
                    {
                        ui.selectable_value(&mut edited.decay_mode, mode, mode.to_string());
                    }
                });
            ui.end_row();
        });
    });

    if edited != *settings {
        actions.push(UiAction::EditSettings(edited));
    }

    ui.add_space(10.0);
    if ui
        .add_enabled(view.apply_settings_enabled, egui::Button::new("Apply settings"))
        .clicked()
    {
        actions.push(UiAction::ApplySettings);
    }
}
